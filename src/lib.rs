//! Metadelta: metadata tree classification and manifest diffing
//!
//! Compares two trees of platform-metadata files and produces two deployable
//! change manifests: a package of additions/modifications and a package of
//! deletions. The core is a typed catalog of metadata shapes, a file
//! classifier over heterogeneous directory layouts, a hash-based tree diff,
//! and an auditable manifest renderer.

pub mod backup;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod xml;
