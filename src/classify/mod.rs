//! File-to-member classification.
//!
//! Resolves each file in a metadata tree to a (type, member name, anchor)
//! identity, applying the layout disambiguation rules: shared directories,
//! bundles, folder-scoped types, child-collection directories, translation
//! bundles, and the territory-model layout. A shape the catalog cannot
//! explain is fatal; exclusions and hidden managed members are soft skips.

use crate::catalog::{TypeCatalog, TypeDescriptor};
use crate::config::RunConfig;
use crate::error::DeltaError;
use crate::types::{ContentHash, DiffClassification};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which snapshot a registry belongs to. The hidden-managed removal side
/// effect only applies while processing the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSide {
    Source,
    Target,
}

/// One file resolved to a metadata identity.
#[derive(Debug, Clone)]
pub struct ClassifiedMember {
    /// Deployable-unit key used for cross-tree grouping: the resolved
    /// directory plus the anchor when the file is subordinate to a larger
    /// member, otherwise the member name.
    pub member_key: String,
    /// Logical name, e.g. "Account", "Account.Foo__c", "MyFolder/MyReport".
    pub member_name: String,
    /// Path relative to the tree root.
    pub file_path: PathBuf,
    pub content_hash: ContentHash,
    /// Resolved type directory (the descriptor's, not the on-disk leaf).
    pub directory: String,
    /// This file represents a folder-type container; excluded from
    /// destructive manifests.
    pub is_folder_marker: bool,
    pub type_descriptor: TypeDescriptor,
    pub file_size: u64,
    pub last_modified: DateTime<Utc>,
    pub classification: DiffClassification,
    /// Byte delta against the other side, informational only.
    pub diff_magnitude: i64,
    /// Folder or parent-unit qualifier from classification, empty for
    /// standalone members.
    pub anchor: String,
}

/// Why a file was left out of the registry. Not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedDirectory,
    ExcludedFile,
    HiddenManagedMember,
}

#[derive(Debug)]
pub enum Outcome {
    Member(Box<ClassifiedMember>),
    Skipped(SkipReason),
}

pub struct MemberClassifier<'a> {
    catalog: &'a TypeCatalog,
    config: &'a RunConfig,
    side: TreeSide,
}

impl<'a> MemberClassifier<'a> {
    pub fn new(catalog: &'a TypeCatalog, config: &'a RunConfig, side: TreeSide) -> Self {
        Self {
            catalog,
            config,
            side,
        }
    }

    /// Classify one file, given its tree root and root-relative path.
    pub fn classify(&self, root: &Path, relative: &Path) -> Result<Outcome, DeltaError> {
        let file_name = leaf_name(relative).ok_or_else(|| DeltaError::UnresolvableShape {
            path: relative.to_path_buf(),
            detail: "path has no file name".to_string(),
        })?;
        let ancestors = ancestor_names(relative);
        let directory = ancestors.first().cloned().unwrap_or_default();

        if ancestors
            .iter()
            .any(|dir| self.config.is_excluded_directory(dir))
        {
            return Ok(Outcome::Skipped(SkipReason::ExcludedDirectory));
        }
        if self.config.is_excluded_file(&file_name) {
            return Ok(Outcome::Skipped(SkipReason::ExcludedFile));
        }

        let stripped = strip_member_name(&file_name);
        let resolved = self.resolve(relative, &file_name, &stripped, &directory, &ancestors)?;

        if self.side == TreeSide::Source
            && self
                .config
                .is_hidden_managed_member(&resolved.descriptor.xml_name, &file_name)
        {
            // The one classification side effect: a hidden managed member
            // cannot legally be redeployed, so it leaves the working copy
            // here.
            std::fs::remove_file(root.join(relative))?;
            debug!(path = %relative.display(), "removed hidden managed member from source tree");
            return Ok(Outcome::Skipped(SkipReason::HiddenManagedMember));
        }

        let absolute = root.join(relative);
        let bytes = std::fs::read(&absolute)?;
        let metadata = std::fs::metadata(&absolute)?;
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let member_key = if resolved.anchor.is_empty() {
            format!("{}/{}", resolved.descriptor.directory_name, resolved.member_name)
        } else {
            format!("{}/{}", resolved.descriptor.directory_name, resolved.anchor)
        };

        Ok(Outcome::Member(Box::new(ClassifiedMember {
            member_key,
            member_name: resolved.member_name,
            file_path: relative.to_path_buf(),
            content_hash: *blake3::hash(&bytes).as_bytes(),
            directory: resolved.descriptor.directory_name.clone(),
            is_folder_marker: resolved.is_folder_marker,
            type_descriptor: resolved.descriptor,
            file_size: bytes.len() as u64,
            last_modified,
            classification: DiffClassification::Unprocessed,
            diff_magnitude: 0,
            anchor: resolved.anchor,
        })))
    }

    fn resolve(
        &self,
        relative: &Path,
        file_name: &str,
        stripped: &str,
        directory: &str,
        ancestors: &[String],
    ) -> Result<Resolved, DeltaError> {
        // Bundle internals resolve to the bundle member no matter how deep
        // they sit, so scan the ancestor chain before anything else.
        if let Some(bundle_name) = nearest_bundle_member(self.catalog, ancestors) {
            let root_dir = ancestors
                .iter()
                .find(|a| self.catalog.is_bundle_directory(a))
                .cloned()
                .unwrap_or_default();
            let descriptor = self.catalog.lookup(&root_dir, Some(file_name)).ok_or_else(|| {
                self.unresolvable(relative, &format!("bundle root '{}' has no type", root_dir))
            })?;
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: bundle_name.clone(),
                anchor: bundle_name,
                is_folder_marker: false,
            });
        }

        // Direct hit on the containing directory.
        if let Some(descriptor) = self.catalog.lookup(directory, Some(file_name)) {
            if self.catalog.is_folder_scoped_directory(directory) {
                // A file sitting directly in a folder-scoped root is the
                // folder container itself, e.g. reports/Sales.reportFolder.
                return Ok(Resolved {
                    descriptor: descriptor.clone(),
                    member_name: stripped.to_string(),
                    anchor: String::new(),
                    is_folder_marker: true,
                });
            }
            if self.catalog.is_child_type(&descriptor.xml_name) {
                // objects/Account/fields/Foo__c.field-meta.xml: the anchor
                // is the owning object, the member is object-qualified.
                let owner = ancestors.get(1).cloned().ok_or_else(|| {
                    self.unresolvable(relative, "child-collection file has no owning folder")
                })?;
                return Ok(Resolved {
                    descriptor: descriptor.clone(),
                    member_name: format!("{}.{}", owner, stripped),
                    anchor: owner,
                    is_folder_marker: false,
                });
            }
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: stripped.to_string(),
                anchor: String::new(),
                is_folder_marker: false,
            });
        }

        // Fall through to the parent directory.
        let parent = match ancestors.get(1) {
            Some(p) => p.as_str(),
            None => {
                return Err(self.unresolvable(relative, "no parent directory to resolve against"))
            }
        };

        if self.catalog.is_translation_bundle_directory(parent) {
            let descriptor = self.catalog.lookup(parent, Some(file_name)).ok_or_else(|| {
                self.unresolvable(relative, "translation bundle directory has no type")
            })?;
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: directory.to_string(),
                anchor: directory.to_string(),
                is_folder_marker: false,
            });
        }

        if self.catalog.is_folder_scoped_directory(parent) {
            // Two folders may hold same-named items; the identity is
            // folder-qualified.
            let descriptor = self.catalog.lookup(parent, Some(file_name)).ok_or_else(|| {
                self.unresolvable(relative, "folder-scoped directory has no type")
            })?;
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: format!("{}/{}", directory, stripped),
                anchor: format!("{}/", directory),
                is_folder_marker: false,
            });
        }

        if self.catalog.is_territory_model_directory(parent) {
            let descriptor = self.catalog.lookup(parent, Some(file_name)).ok_or_else(|| {
                self.unresolvable(relative, "territory model directory has no type")
            })?;
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: directory.to_string(),
                anchor: directory.to_string(),
                is_folder_marker: false,
            });
        }

        // objects-style singular-type directory: the file already carries
        // its full local name.
        if let Some(descriptor) = self.catalog.lookup(parent, Some(file_name)) {
            return Ok(Resolved {
                descriptor: descriptor.clone(),
                member_name: stripped.to_string(),
                anchor: String::new(),
                is_folder_marker: false,
            });
        }

        Err(self.unresolvable(
            relative,
            &format!(
                "neither directory '{}' nor parent '{}' maps to a known type",
                directory, parent
            ),
        ))
    }

    fn unresolvable(&self, relative: &Path, detail: &str) -> DeltaError {
        DeltaError::UnresolvableShape {
            path: relative.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

struct Resolved {
    descriptor: TypeDescriptor,
    member_name: String,
    anchor: String,
    is_folder_marker: bool,
}

fn leaf_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Directory names from the file upward: [parent, grandparent, ...].
fn ancestor_names(relative: &Path) -> Vec<String> {
    let mut names: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    names.pop(); // drop the file itself
    names.reverse();
    names
}

/// If some ancestor is a bundle root, the member is the component directly
/// below it.
fn nearest_bundle_member(catalog: &TypeCatalog, ancestors: &[String]) -> Option<String> {
    for (idx, name) in ancestors.iter().enumerate() {
        if catalog.is_bundle_directory(name) && idx > 0 {
            return Some(ancestors[idx - 1].clone());
        }
    }
    None
}

/// Strip the meta-sidecar suffix and the final semantic extension.
///
/// "Account.object-meta.xml" -> "Account", "My.Report.Name.report" ->
/// "My.Report.Name", "Foo" -> "Foo".
pub fn strip_member_name(file_name: &str) -> String {
    let base = file_name.strip_suffix("-meta.xml").unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((name, _ext)) if !name.is_empty() => name.to_string(),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDescriptor;
    use std::fs;

    fn descriptor(
        directory: &str,
        xml_name: &str,
        suffix: Option<&str>,
        in_folder: bool,
        children: &[&str],
    ) -> TypeDescriptor {
        TypeDescriptor {
            directory_name: directory.to_string(),
            xml_name: xml_name.to_string(),
            suffix: suffix.map(str::to_string),
            in_folder,
            has_meta_file: false,
            child_xml_names: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn catalog() -> TypeCatalog {
        TypeCatalog::build(vec![
            descriptor("classes", "ApexClass", Some("cls"), false, &[]),
            descriptor("triggers", "ApexTrigger", Some("trigger"), false, &[]),
            descriptor(
                "objects",
                "CustomObject",
                Some("object"),
                false,
                &["CustomField", "ListView"],
            ),
            descriptor("reports", "Report", Some("report"), true, &[]),
            descriptor("aura", "AuraDefinitionBundle", None, false, &[]),
            descriptor(
                "objectTranslations",
                "CustomObjectTranslation",
                Some("objectTranslation"),
                false,
                &[],
            ),
            descriptor(
                "territory2Models",
                "Territory2Model",
                Some("territory2Model"),
                false,
                &[],
            ),
        ])
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn classify_one(root: &Path, rel: &str, side: TreeSide, config: &RunConfig) -> Outcome {
        let catalog = catalog();
        let classifier = MemberClassifier::new(&catalog, config, side);
        classifier.classify(root, Path::new(rel)).unwrap()
    }

    fn expect_member(outcome: Outcome) -> ClassifiedMember {
        match outcome {
            Outcome::Member(m) => *m,
            Outcome::Skipped(reason) => panic!("expected member, skipped: {:?}", reason),
        }
    }

    #[test]
    fn plain_suffix_type_resolves_directly() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "classes/Greeter.cls", "public class Greeter {}");
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "classes/Greeter.cls",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "Greeter");
        assert_eq!(member.member_key, "classes/Greeter");
        assert_eq!(member.type_descriptor.xml_name, "ApexClass");
        assert!(!member.is_folder_marker);
        assert_eq!(member.classification, DiffClassification::Unprocessed);
    }

    #[test]
    fn object_file_resolves_via_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "objects/Account/Account.object-meta.xml",
            "<CustomObject/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "objects/Account/Account.object-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "Account");
        assert_eq!(member.member_key, "objects/Account");
        assert_eq!(member.type_descriptor.xml_name, "CustomObject");
    }

    #[test]
    fn standalone_field_file_is_object_qualified() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "objects/Account/fields/Foo__c.field-meta.xml",
            "<CustomField/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "objects/Account/fields/Foo__c.field-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "Account.Foo__c");
        assert_eq!(member.type_descriptor.xml_name, "CustomField");
        assert_eq!(member.anchor, "Account");
        assert_eq!(member.member_key, "fields/Account");
    }

    #[test]
    fn bundle_internals_share_the_bundle_member() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "aura/Hello/Hello.cmp", "<aura:component/>");
        write(dir.path(), "aura/Hello/HelloController.js", "({})");
        let config = RunConfig::default();
        for rel in ["aura/Hello/Hello.cmp", "aura/Hello/HelloController.js"] {
            let member = expect_member(classify_one(dir.path(), rel, TreeSide::Target, &config));
            assert_eq!(member.member_name, "Hello");
            assert_eq!(member.member_key, "aura/Hello");
            assert_eq!(member.type_descriptor.xml_name, "AuraDefinitionBundle");
        }
    }

    #[test]
    fn folder_scoped_item_is_folder_qualified() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "reports/Sales/Pipeline.report-meta.xml",
            "<Report/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "reports/Sales/Pipeline.report-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "Sales/Pipeline");
        assert_eq!(member.type_descriptor.xml_name, "Report");
        assert!(!member.is_folder_marker);
    }

    #[test]
    fn folder_container_file_is_marked() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "reports/Sales.reportFolder-meta.xml",
            "<ReportFolder/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "reports/Sales.reportFolder-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert!(member.is_folder_marker);
        assert_eq!(member.member_name, "Sales");
        assert_eq!(member.type_descriptor.xml_name, "ReportFolder");
    }

    #[test]
    fn translation_bundle_member_is_the_bundle_folder() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "objectTranslations/Account-fr/Account-fr.objectTranslation-meta.xml",
            "<CustomObjectTranslation/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "objectTranslations/Account-fr/Account-fr.objectTranslation-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "Account-fr");
        assert_eq!(member.type_descriptor.xml_name, "CustomObjectTranslation");
    }

    #[test]
    fn territory_model_member_is_the_model_folder() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "territory2Models/EU/EU.territory2Model-meta.xml",
            "<Territory2Model/>",
        );
        let config = RunConfig::default();
        let member = expect_member(classify_one(
            dir.path(),
            "territory2Models/EU/EU.territory2Model-meta.xml",
            TreeSide::Target,
            &config,
        ));
        assert_eq!(member.member_name, "EU");
        assert_eq!(member.type_descriptor.xml_name, "Territory2Model");
    }

    #[test]
    fn excluded_directories_and_files_are_soft_skips() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".git/classes/X.cls", "x");
        write(dir.path(), "classes/package.xml", "<Package/>");
        let config = RunConfig::default();
        assert!(matches!(
            classify_one(dir.path(), ".git/classes/X.cls", TreeSide::Source, &config),
            Outcome::Skipped(SkipReason::ExcludedDirectory)
        ));
        assert!(matches!(
            classify_one(dir.path(), "classes/package.xml", TreeSide::Source, &config),
            Outcome::Skipped(SkipReason::ExcludedFile)
        ));
    }

    #[test]
    fn hidden_managed_member_removed_from_source_tree_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "classes/ns__Hidden.cls", "public class H {}");
        let config = RunConfig::default();
        let outcome = classify_one(
            dir.path(),
            "classes/ns__Hidden.cls",
            TreeSide::Source,
            &config,
        );
        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::HiddenManagedMember)
        ));
        assert!(!dir.path().join("classes/ns__Hidden.cls").exists());

        // Target side keeps the member and the file.
        write(dir.path(), "classes/ns__Hidden.cls", "public class H {}");
        let outcome = classify_one(
            dir.path(),
            "classes/ns__Hidden.cls",
            TreeSide::Target,
            &config,
        );
        assert!(matches!(outcome, Outcome::Member(_)));
        assert!(dir.path().join("classes/ns__Hidden.cls").exists());
    }

    #[test]
    fn unknown_shape_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mystery/strange/Thing.weird", "?");
        let config = RunConfig::default();
        let catalog = catalog();
        let classifier = MemberClassifier::new(&catalog, &config, TreeSide::Source);
        let err = classifier
            .classify(dir.path(), Path::new("mystery/strange/Thing.weird"))
            .unwrap_err();
        assert!(err.is_fatal_shape());
    }

    #[test]
    fn strip_member_name_handles_sidecars_and_multi_dot_names() {
        assert_eq!(strip_member_name("Account.object-meta.xml"), "Account");
        assert_eq!(strip_member_name("Foo__c.field-meta.xml"), "Foo__c");
        assert_eq!(strip_member_name("Greeter.cls"), "Greeter");
        assert_eq!(strip_member_name("My.Report.Name.report"), "My.Report.Name");
        assert_eq!(strip_member_name("README"), "README");
    }
}
