//! Registry comparison.
//!
//! Compares two registries path-by-path and hash-by-hash into four
//! partitions. Classification is a pure function of byte content: size and
//! mtime are carried for diagnostics only, so comparing a tree against an
//! identical copy of itself is always empty.

use crate::catalog::TypeCatalog;
use crate::classify::ClassifiedMember;
use crate::config::RunConfig;
use crate::error::DeltaError;
use crate::tree::indexer::{Registry, TreeIndexer};
use crate::types::DiffClassification;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Partitioned result of one comparison run.
#[derive(Debug)]
pub struct DiffOutcome {
    /// Additions and modifications, deployed via the package manifest.
    /// Parents with child collections carry their riding children inline.
    pub package: Vec<ClassifiedMember>,
    /// Target-only members, removed via the destructive manifest.
    pub destructive: Vec<ClassifiedMember>,
    /// Exact matches on the left side, candidates for local pruning.
    pub matches: Vec<ClassifiedMember>,
    /// Right-side entries whose content differs; informational only, the
    /// left-side Differ entry supersedes them.
    pub ignored: Vec<ClassifiedMember>,
    /// Match paths safe to delete from the working copy: exact matches not
    /// belonging to a deployable unit that still carries a payload.
    pub prune_candidates: Vec<PathBuf>,
    pub summary: DiffSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffSummary {
    pub left_only: usize,
    pub right_only: usize,
    pub differing: usize,
    pub matching: usize,
    pub ignored: usize,
}

pub struct DiffEngine<'a> {
    catalog: &'a TypeCatalog,
    config: &'a RunConfig,
}

impl<'a> DiffEngine<'a> {
    pub fn new(catalog: &'a TypeCatalog, config: &'a RunConfig) -> Self {
        Self { catalog, config }
    }

    /// Compare left (source) against right (target).
    ///
    /// Left pass: absent on the right is `LeftOnly`, differing hash is
    /// `Differ`, equal hash is `Match`. Right pass: absent on the left is
    /// `RightOnly`; differing hashes were already accounted for and land in
    /// the ignore set.
    pub fn compare(&self, left: &Registry, right: &Registry) -> Result<DiffOutcome, DeltaError> {
        let indexer = TreeIndexer::new(self.catalog, self.config);
        let mut package = Vec::new();
        let mut destructive = Vec::new();
        let mut matches = Vec::new();
        let mut ignored = Vec::new();
        let mut summary = DiffSummary::default();

        for (path, member) in left.iter() {
            match right.get(path) {
                None => {
                    summary.left_only += 1;
                    let entry = with_classification(member, DiffClassification::LeftOnly, 0);
                    let children =
                        self.riding_children(&indexer, left, right, &entry, None)?;
                    package.push(entry);
                    package.extend(children);
                }
                Some(other) if other.content_hash != member.content_hash => {
                    summary.differing += 1;
                    debug!(
                        path = %path.display(),
                        left = %&hex::encode(member.content_hash)[..12],
                        right = %&hex::encode(other.content_hash)[..12],
                        "content differs"
                    );
                    let magnitude = member.file_size as i64 - other.file_size as i64;
                    let entry = with_classification(member, DiffClassification::Differ, magnitude);
                    let children =
                        self.riding_children(&indexer, left, right, &entry, Some(other))?;
                    package.push(entry);
                    package.extend(children);
                }
                Some(_) => {
                    summary.matching += 1;
                    matches.push(with_classification(member, DiffClassification::Match, 0));
                }
            }
        }

        for (path, member) in right.iter() {
            match left.get(path) {
                None => {
                    summary.right_only += 1;
                    let entry = with_classification(member, DiffClassification::RightOnly, 0);
                    let children = indexer.expand_children(right, &entry)?;
                    destructive.push(entry);
                    destructive.extend(children);
                }
                Some(other) if other.content_hash != member.content_hash => {
                    // Deletion is not proposed: the left-side Differ entry
                    // supersedes this one.
                    summary.ignored += 1;
                    ignored.push(with_classification(member, DiffClassification::Differ, 0));
                }
                Some(_) => {}
            }
        }

        let prune_candidates = prune_candidates(&package, &matches);

        info!(
            left_only = summary.left_only,
            right_only = summary.right_only,
            differing = summary.differing,
            matching = summary.matching,
            ignored = summary.ignored,
            "compared registries"
        );

        Ok(DiffOutcome {
            package,
            destructive,
            matches,
            ignored,
            prune_candidates,
            summary,
        })
    }

    /// Children riding along with a package-bound parent.
    ///
    /// Children never classify independently: within a parent already in the
    /// result set, fragment hashes select which children appear. A parent
    /// absent from the right contributes every child.
    fn riding_children(
        &self,
        indexer: &TreeIndexer<'_>,
        left: &Registry,
        right: &Registry,
        parent: &ClassifiedMember,
        right_parent: Option<&ClassifiedMember>,
    ) -> Result<Vec<ClassifiedMember>, DeltaError> {
        if parent.type_descriptor.child_xml_names.is_empty() {
            return Ok(Vec::new());
        }
        let own = indexer.expand_children(left, parent)?;
        let Some(right_parent) = right_parent else {
            return Ok(own);
        };
        let other_hashes: HashMap<String, [u8; 32]> = indexer
            .expand_children(right, right_parent)?
            .into_iter()
            .map(|c| (c.member_name.clone(), c.content_hash))
            .collect();
        Ok(own
            .into_iter()
            .filter(|child| {
                other_hashes
                    .get(&child.member_name)
                    .map_or(true, |hash| *hash != child.content_hash)
            })
            .collect())
    }
}

fn with_classification(
    member: &ClassifiedMember,
    classification: DiffClassification,
    magnitude: i64,
) -> ClassifiedMember {
    let mut out = member.clone();
    out.classification = classification;
    out.diff_magnitude = magnitude;
    out
}

/// Exact matches eligible for physical deletion from the working copy.
///
/// A match belonging to the same deployable unit as a payload-carrying
/// entry is retained: deleting unchanged sibling files of a changed unit
/// would corrupt it.
fn prune_candidates(package: &[ClassifiedMember], matches: &[ClassifiedMember]) -> Vec<PathBuf> {
    let payload_units: HashSet<&str> =
        package.iter().map(|m| m.member_key.as_str()).collect();
    matches
        .iter()
        .filter(|m| !payload_units.contains(m.member_key.as_str()))
        .map(|m| m.file_path.clone())
        .collect()
}
