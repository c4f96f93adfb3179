//! Run configuration.
//!
//! Exclusion rules are data, not code: both lists are user-extensible and
//! load from a TOML file alongside the rest of the run settings.

use crate::error::DeltaError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one classification/diff run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target platform API version, rendered in manifest footers.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Directory names excluded from classification entirely.
    #[serde(default = "default_excluded_directories")]
    pub excluded_directories: Vec<String>,

    /// Literal file names excluded from manifest membership.
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,

    /// Types hidden or non-editable when installed from a package. Members
    /// of these types carrying the namespace token are dropped from the
    /// source registry and removed on disk.
    #[serde(default = "default_hidden_when_managed")]
    pub hidden_when_managed: Vec<String>,

    /// Namespace separator token marking managed members.
    #[serde(default = "default_namespace_token")]
    pub namespace_token: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_version() -> String {
    "58.0".to_string()
}

fn default_excluded_directories() -> Vec<String> {
    ["..", ".git", ".sfdx", ".vscode", "node_modules", "config"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_excluded_files() -> Vec<String> {
    [
        "package.xml",
        "destructiveChanges.xml",
        ".forceignore",
        ".gitignore",
        "sfdx-project.json",
        "jsconfig.json",
        ".eslintrc.json",
        "README.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_hidden_when_managed() -> Vec<String> {
    ["ApexClass", "ApexComponent", "ApexPage", "ApexTrigger"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_namespace_token() -> String {
    "__".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            excluded_directories: default_excluded_directories(),
            excluded_files: default_excluded_files(),
            hidden_when_managed: default_hidden_when_managed(),
            namespace_token: default_namespace_token(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from a TOML file; absent keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, DeltaError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeltaError::ConfigError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            DeltaError::ConfigError(format!("cannot parse config {}: {}", path.display(), e))
        })
    }

    pub fn is_excluded_directory(&self, name: &str) -> bool {
        self.excluded_directories.iter().any(|d| d == name)
    }

    pub fn is_excluded_file(&self, name: &str) -> bool {
        self.excluded_files.iter().any(|f| f == name)
    }

    /// Whether a member of `type_name` named `member` is hidden on managed
    /// installs and must be dropped from the source side.
    pub fn is_hidden_managed_member(&self, type_name: &str, file_name: &str) -> bool {
        self.hidden_when_managed.iter().any(|t| t == type_name)
            && file_name.contains(&self.namespace_token)
    }
}
