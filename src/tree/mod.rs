//! Tree walking and registry building.

pub mod indexer;
pub mod walker;

pub use indexer::{Registry, TreeIndexer};
pub use walker::{TreeWalker, WalkEntry};
