//! CLI Tooling
//!
//! Command-line orchestration around the classification/diff core. The core
//! never parses flags; this layer wires configuration, the catalog source,
//! backup lifecycle, indexing, comparison, and manifest output together.

use crate::backup::SnapshotBackup;
use crate::catalog::source::{
    JsonCatalogSource, JsonMemberListSource, MemberListSource, MetadataCatalogSource,
};
use crate::catalog::TypeCatalog;
use crate::classify::TreeSide;
use crate::config::RunConfig;
use crate::diff::DiffEngine;
use crate::error::DeltaError;
use crate::manifest::ManifestWriter;
use crate::tree::indexer::TreeIndexer;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Metadelta CLI - metadata tree classification and manifest diffing
#[derive(Parser)]
#[command(name = "metadelta")]
#[command(about = "Compare two metadata trees and emit deployable change manifests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare source against target and write both manifests
    Diff {
        /// Source snapshot root
        #[arg(long)]
        source: PathBuf,
        /// Target snapshot root
        #[arg(long)]
        target: PathBuf,
        /// Catalog describe-snapshot JSON file
        #[arg(long)]
        catalog: PathBuf,
        /// Output directory for package.xml and destructiveChanges.xml
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Delete exact-match files from the source working copy
        #[arg(long)]
        prune: bool,
        /// Backup directory (default: "<source>.backup")
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Load a catalog snapshot and print its lookup tables
    Catalog {
        /// Catalog describe-snapshot JSON file
        #[arg(long)]
        catalog: PathBuf,
        /// Optional member-list snapshot for per-type member counts
        #[arg(long)]
        members: Option<PathBuf>,
    },
    /// Restore the source tree from its backup
    Restore {
        /// Source snapshot root
        #[arg(long)]
        source: PathBuf,
        /// Backup directory (default: "<source>.backup")
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
}

pub struct CliContext {
    config: RunConfig,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, DeltaError> {
        let config = match config_path {
            Some(path) => RunConfig::load(&path)?,
            None => RunConfig::default(),
        };
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, DeltaError> {
        match command {
            Commands::Diff {
                source,
                target,
                catalog,
                out,
                prune,
                backup_dir,
                format,
            } => self.run_diff(source, target, catalog, out, *prune, backup_dir.as_ref(), format),
            Commands::Catalog { catalog, members } => {
                self.run_catalog(catalog, members.as_ref())
            }
            Commands::Restore { source, backup_dir } => {
                let backup =
                    SnapshotBackup::new(source, resolve_backup_dir(source, backup_dir.as_ref()));
                backup.restore_from_backup()?;
                Ok(format!("Restored {} from backup.", source.display()))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_diff(
        &self,
        source: &PathBuf,
        target: &PathBuf,
        catalog_path: &PathBuf,
        out: &PathBuf,
        prune: bool,
        backup_dir: Option<&PathBuf>,
        format: &str,
    ) -> Result<String, DeltaError> {
        let descriptors =
            JsonCatalogSource::new(catalog_path).describe(&self.config.api_version)?;
        let catalog = TypeCatalog::build(descriptors);

        // Classification mutates the source side (hidden managed members),
        // so the backup comes first.
        let backup = SnapshotBackup::new(source, resolve_backup_dir(source, backup_dir));
        backup.ensure_backup()?;

        let indexer = TreeIndexer::new(&catalog, &self.config);
        let left = indexer.index(source, TreeSide::Source)?;
        let right = indexer.index(target, TreeSide::Target)?;

        let outcome = DiffEngine::new(&catalog, &self.config).compare(&left, &right)?;

        let writer = ManifestWriter::new(self.config.api_version.clone());
        let package = writer.render(&outcome.package, false);
        let destructive = writer.render(&outcome.destructive, true);

        std::fs::create_dir_all(out)?;
        std::fs::write(out.join("package.xml"), &package)?;
        std::fs::write(out.join("destructiveChanges.xml"), &destructive)?;

        let mut pruned = 0usize;
        if prune {
            for path in &outcome.prune_candidates {
                std::fs::remove_file(source.join(path))?;
                pruned += 1;
            }
            info!(pruned, "pruned exact matches from source working copy");
        }

        if format == "json" {
            return Ok(serde_json::to_string_pretty(&json!({
                "summary": outcome.summary,
                "package": out.join("package.xml"),
                "destructive": out.join("destructiveChanges.xml"),
                "prune_candidates": outcome.prune_candidates,
                "pruned": pruned,
            }))
            .map_err(|e| DeltaError::ConfigError(format!("summary serialization: {}", e)))?);
        }

        let s = &outcome.summary;
        let mut output = String::new();
        output.push_str(&format!(
            "Compared {} source files against {} target files.\n",
            left.len(),
            right.len()
        ));
        output.push_str(&format!(
            "  left-only: {}, differing: {}, matching: {}, right-only: {}, ignored: {}\n",
            s.left_only, s.differing, s.matching, s.right_only, s.ignored
        ));
        output.push_str(&format!(
            "Wrote {} and {}.\n",
            out.join("package.xml").display(),
            out.join("destructiveChanges.xml").display()
        ));
        if prune {
            output.push_str(&format!("Pruned {} exact matches.\n", pruned));
        } else if !outcome.prune_candidates.is_empty() {
            output.push_str(&format!(
                "{} exact matches eligible for pruning (re-run with --prune).\n",
                outcome.prune_candidates.len()
            ));
        }
        Ok(output)
    }

    fn run_catalog(
        &self,
        catalog_path: &PathBuf,
        members_path: Option<&PathBuf>,
    ) -> Result<String, DeltaError> {
        let descriptors =
            JsonCatalogSource::new(catalog_path).describe(&self.config.api_version)?;
        let catalog = TypeCatalog::build(descriptors);
        let member_source = members_path.map(JsonMemberListSource::new);

        let mut output = String::new();
        output.push_str(&format!(
            "Catalog for API {} ({} directories):\n",
            self.config.api_version,
            catalog.directories().len()
        ));
        for (directory, type_names) in catalog.directories() {
            for type_name in type_names {
                match &member_source {
                    Some(source) => {
                        let count = source.list_members(type_name)?.len();
                        output.push_str(&format!(
                            "  {}/ -> {} ({} existing members)\n",
                            directory, type_name, count
                        ));
                    }
                    None => {
                        output.push_str(&format!("  {}/ -> {}\n", directory, type_name));
                    }
                }
            }
        }
        Ok(output)
    }
}

fn resolve_backup_dir(source: &PathBuf, explicit: Option<&PathBuf>) -> PathBuf {
    match explicit {
        Some(dir) => dir.clone(),
        None => {
            let mut name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "source".to_string());
            name.push_str(".backup");
            source
                .parent()
                .map(|p| p.join(&name))
                .unwrap_or_else(|| PathBuf::from(name))
        }
    }
}
