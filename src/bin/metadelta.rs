//! Metadelta CLI Binary

use anyhow::Context;
use clap::Parser;
use metadelta::logging::init_logging;
use metadelta::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let mut logging = context.config().logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        logging.file = Some(file.clone());
    }
    if let Err(e) = init_logging(Some(&logging)).context("initializing logging") {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
