//! Snapshot backup lifecycle for the source tree.
//!
//! The classifier's hidden-managed removal and the post-diff pruning both
//! mutate the source working copy, so orchestration takes a backup first.
//! Two states: Uninitialized and BackedUp. `ensure_backup` is idempotent,
//! which makes repeated destructive local pruning reversible: the first run
//! creates the backup, later runs restore from it instead of re-creating.

use crate::error::DeltaError;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    Uninitialized,
    BackedUp,
}

pub struct SnapshotBackup {
    source: PathBuf,
    backup_dir: PathBuf,
}

impl SnapshotBackup {
    pub fn new(source: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn state(&self) -> BackupState {
        if self.backup_dir.is_dir() {
            BackupState::BackedUp
        } else {
            BackupState::Uninitialized
        }
    }

    /// Take a backup of the source tree if none exists yet.
    pub fn ensure_backup(&self) -> Result<BackupState, DeltaError> {
        if self.state() == BackupState::BackedUp {
            return Ok(BackupState::BackedUp);
        }
        if !self.source.is_dir() {
            return Err(DeltaError::ConfigError(format!(
                "source tree {} does not exist",
                self.source.display()
            )));
        }
        copy_tree(&self.source, &self.backup_dir)?;
        info!(
            source = %self.source.display(),
            backup = %self.backup_dir.display(),
            "created source backup"
        );
        Ok(BackupState::BackedUp)
    }

    /// Replace the source tree with the backed-up snapshot.
    pub fn restore_from_backup(&self) -> Result<(), DeltaError> {
        if self.state() == BackupState::Uninitialized {
            return Err(DeltaError::ConfigError(format!(
                "no backup at {} to restore from",
                self.backup_dir.display()
            )));
        }
        if self.source.exists() {
            std::fs::remove_dir_all(&self.source)?;
        }
        copy_tree(&self.backup_dir, &self.source)?;
        info!(source = %self.source.display(), "restored source tree from backup");
        Ok(())
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), DeltaError> {
    std::fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| DeltaError::ExternalCall(format!("backup walk failed: {}", e)))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| DeltaError::ExternalCall(format!("backup path outside tree: {}", e)))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn ensure_backup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("classes")).unwrap();
        fs::write(source.join("classes/A.cls"), "v1").unwrap();

        let backup = SnapshotBackup::new(&source, dir.path().join("bak"));
        assert_eq!(backup.state(), BackupState::Uninitialized);
        assert_eq!(backup.ensure_backup().unwrap(), BackupState::BackedUp);

        // A second ensure after edits must not refresh the snapshot.
        fs::write(source.join("classes/A.cls"), "v2").unwrap();
        assert_eq!(backup.ensure_backup().unwrap(), BackupState::BackedUp);
        let backed = fs::read_to_string(dir.path().join("bak/classes/A.cls")).unwrap();
        assert_eq!(backed, "v1");
    }

    #[test]
    fn restore_recovers_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("classes")).unwrap();
        fs::write(source.join("classes/A.cls"), "keep me").unwrap();

        let backup = SnapshotBackup::new(&source, dir.path().join("bak"));
        backup.ensure_backup().unwrap();
        fs::remove_file(source.join("classes/A.cls")).unwrap();

        backup.restore_from_backup().unwrap();
        assert_eq!(
            fs::read_to_string(source.join("classes/A.cls")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn restore_without_backup_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backup = SnapshotBackup::new(dir.path().join("src"), dir.path().join("bak"));
        assert!(matches!(
            backup.restore_from_backup(),
            Err(DeltaError::ConfigError(_))
        ));
    }
}
