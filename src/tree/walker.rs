//! Lazy filesystem walk over a metadata tree.
//!
//! Yields `(path, parent, is_directory)` entries relative to the tree root,
//! pruning excluded directories before descending into them. Restartable:
//! each call to [`TreeWalker::entries`] starts a fresh walk. No ordering is
//! guaranteed beyond walkdir's directory-contents grouping.

use crate::error::DeltaError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One visited filesystem entry, paths relative to the walk root.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub parent: PathBuf,
    pub is_directory: bool,
}

pub struct TreeWalker {
    root: PathBuf,
    excluded_directories: Vec<String>,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_directories: Vec::new(),
        }
    }

    /// Directory names never descended into.
    pub fn with_excluded_directories(mut self, names: Vec<String>) -> Self {
        self.excluded_directories = names;
        self
    }

    /// Lazily walk the tree. The root itself is not yielded.
    pub fn entries(&self) -> impl Iterator<Item = Result<WalkEntry, DeltaError>> + '_ {
        let root = self.root.clone();
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !self.excluded_directories.iter().any(|d| d == name.as_ref())
            })
            .map(move |result| match result {
                Ok(entry) => {
                    let relative = entry
                        .path()
                        .strip_prefix(&root)
                        .unwrap_or(entry.path())
                        .to_path_buf();
                    let parent = relative.parent().unwrap_or(Path::new("")).to_path_buf();
                    Ok(WalkEntry {
                        path: relative,
                        parent,
                        is_directory: entry.file_type().is_dir(),
                    })
                }
                Err(e) => Err(DeltaError::ExternalCall(format!("tree walk failed: {}", e))),
            })
    }
}
