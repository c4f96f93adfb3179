//! Registry building and child-collection expansion.
//!
//! The indexer walks one tree, classifies every file, and produces a
//! registry keyed by relative file path. The path key is what the diff
//! engine pairs between trees; `member_key`/`member_name` ride inside each
//! record for pruning and manifest rendering.

use crate::catalog::TypeCatalog;
use crate::classify::{ClassifiedMember, MemberClassifier, Outcome, TreeSide};
use crate::config::RunConfig;
use crate::error::DeltaError;
use crate::tree::walker::TreeWalker;
use crate::xml;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One tree's classified members, keyed by root-relative file path.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    side: TreeSide,
    members: BTreeMap<PathBuf, ClassifiedMember>,
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>, side: TreeSide) -> Self {
        Self {
            root: root.into(),
            side,
            members: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn side(&self) -> TreeSide {
        self.side
    }

    /// Later writes to the same path overwrite; only one file should ever
    /// produce a given path.
    pub fn insert(&mut self, member: ClassifiedMember) {
        self.members.insert(member.file_path.clone(), member);
    }

    pub fn get(&self, path: &Path) -> Option<&ClassifiedMember> {
        self.members.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ClassifiedMember)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub struct TreeIndexer<'a> {
    catalog: &'a TypeCatalog,
    config: &'a RunConfig,
}

impl<'a> TreeIndexer<'a> {
    pub fn new(catalog: &'a TypeCatalog, config: &'a RunConfig) -> Self {
        Self { catalog, config }
    }

    /// Walk `root` and classify every file into a fresh registry.
    ///
    /// Excluded directories are pruned during the walk and re-checked by the
    /// classifier; an unresolvable file aborts the whole index pass.
    pub fn index(&self, root: &Path, side: TreeSide) -> Result<Registry, DeltaError> {
        let classifier = MemberClassifier::new(self.catalog, self.config, side);
        let walker = TreeWalker::new(root)
            .with_excluded_directories(self.config.excluded_directories.clone());
        let mut registry = Registry::new(root, side);
        let mut skipped = 0usize;

        for entry in walker.entries() {
            let entry = entry?;
            if entry.is_directory {
                continue;
            }
            match classifier.classify(root, &entry.path)? {
                Outcome::Member(member) => registry.insert(*member),
                Outcome::Skipped(reason) => {
                    skipped += 1;
                    debug!(path = %entry.path.display(), reason = ?reason, "skipped");
                }
            }
        }

        info!(
            root = %root.display(),
            side = ?side,
            members = registry.len(),
            skipped,
            "indexed tree"
        );
        Ok(registry)
    }

    /// Synthesize child members declared inline in a parent's file.
    ///
    /// Each child's hash covers only its own serialized fragment, so an edit
    /// to one sibling never masks a delta in another. Children mirror the
    /// parent's classification; they are never compared independently.
    pub fn expand_children(
        &self,
        registry: &Registry,
        parent: &ClassifiedMember,
    ) -> Result<Vec<ClassifiedMember>, DeltaError> {
        if parent.type_descriptor.child_xml_names.is_empty() {
            return Ok(Vec::new());
        }

        let absolute = registry.root().join(&parent.file_path);
        let raw = std::fs::read_to_string(&absolute)?;
        let document = xml::parse_document(&raw).map_err(|detail| DeltaError::MalformedXml {
            path: parent.file_path.clone(),
            detail,
        })?;

        let mut children = Vec::new();
        for child_type in &parent.type_descriptor.child_xml_names {
            let Some(descriptor) = self.catalog.by_type(child_type) else {
                warn!(child = %child_type, "child type not in catalog, skipping expansion");
                continue;
            };
            let Some(element_name) = self.catalog.child_element_name(child_type) else {
                continue;
            };
            for element in document.children_named(element_name) {
                let full_name = element.child_text("fullName").map_err(|detail| {
                    DeltaError::MalformedXml {
                        path: parent.file_path.clone(),
                        detail,
                    }
                })?;
                let fragment = element.to_fragment();
                children.push(ClassifiedMember {
                    member_key: format!("{}/{}", descriptor.directory_name, parent.member_name),
                    member_name: format!("{}.{}", parent.member_name, full_name),
                    file_path: parent.file_path.clone(),
                    content_hash: *blake3::hash(fragment.as_bytes()).as_bytes(),
                    directory: descriptor.directory_name.clone(),
                    is_folder_marker: false,
                    type_descriptor: descriptor.clone(),
                    file_size: fragment.len() as u64,
                    last_modified: parent.last_modified,
                    classification: parent.classification,
                    diff_magnitude: 0,
                    anchor: parent.member_name.clone(),
                });
            }
        }
        Ok(children)
    }
}
