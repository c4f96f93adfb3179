//! Core types shared across the metadata diff pipeline.

use serde::{Deserialize, Serialize};

/// ContentHash: checksum over file bytes, used only for equality testing.
pub type ContentHash = [u8; 32];

/// Diff state of a classified member. Set exactly once by the diff engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffClassification {
    /// Initial state, before the registries have been compared.
    Unprocessed,
    /// Present on the left (source) side only.
    LeftOnly,
    /// Present on the right (target) side only.
    RightOnly,
    /// Present on both sides with equal content hashes.
    Match,
    /// Present on both sides with differing content hashes.
    Differ,
}

impl DiffClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffClassification::Unprocessed => "unprocessed",
            DiffClassification::LeftOnly => "left-only",
            DiffClassification::RightOnly => "right-only",
            DiffClassification::Match => "match",
            DiffClassification::Differ => "differ",
        }
    }
}
