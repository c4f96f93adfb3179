//! Metadata type catalog.
//!
//! Wraps the platform's type-descriptor list into lookup tables: by
//! directory name, by type name, and by layout role (folder-scoped, bundle,
//! child-collection). Built once per run from a [`source::MetadataCatalogSource`]
//! snapshot and immutable afterward.

pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One platform metadata type as the platform describes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// On-disk folder holding instances of this type, e.g. "objects".
    #[serde(rename = "directoryName")]
    pub directory_name: String,
    /// Logical type name, e.g. "CustomObject".
    #[serde(rename = "xmlName")]
    pub xml_name: String,
    /// File extension discriminator, absent for bundle-style types.
    #[serde(default)]
    pub suffix: Option<String>,
    /// Instances live inside named sub-folders (reports, dashboards, ...).
    #[serde(rename = "inFolder", default)]
    pub in_folder: bool,
    /// Instances are accompanied by a `-meta.xml` sidecar.
    #[serde(rename = "metaFile", default)]
    pub has_meta_file: bool,
    /// Child-collection type names nested inside this type's file.
    #[serde(rename = "childXmlNames", default)]
    pub child_xml_names: Vec<String>,
}

/// Folder-container types the platform does not describe natively.
const FOLDER_CONTAINER_TYPES: &[(&str, &str)] = &[
    ("Dashboard", "DashboardFolder"),
    ("Document", "DocumentFolder"),
    ("EmailTemplate", "EmailFolder"),
    ("Report", "ReportFolder"),
];

/// Fixed child-type to directory-name table. Children have no independent
/// directory of their own; this also names the element tag that holds the
/// child collection inside its parent's file.
const CHILD_DIRECTORIES: &[(&str, &str, &str)] = &[
    ("CustomField", "fields", "field"),
    ("BusinessProcess", "businessProcesses", "businessProcess"),
    ("CompactLayout", "compactLayouts", "compactLayout"),
    ("FieldSet", "fieldSets", "fieldSet"),
    ("Index", "indexes", "index"),
    ("ListView", "listViews", "listView"),
    ("RecordType", "recordTypes", "recordType"),
    ("SharingReason", "sharingReasons", "sharingReason"),
    ("ValidationRule", "validationRules", "validationRule"),
    ("WebLink", "webLinks", "webLink"),
    ("WorkflowAlert", "alerts", "workflowAlert"),
    ("WorkflowFieldUpdate", "fieldUpdates", "workflowFieldUpdate"),
    ("WorkflowKnowledgePublish", "knowledgePublishes", "workflowKnowledgePublish"),
    ("WorkflowOutboundMessage", "outboundMessages", "workflowOutboundMessage"),
    ("WorkflowRule", "rules", "workflowRule"),
    ("WorkflowTask", "tasks", "workflowTask"),
    ("SharingCriteriaRule", "sharingCriteriaRules", "sharingCriteriaRule"),
    ("SharingGuestRule", "sharingGuestRules", "sharingGuestRule"),
    ("SharingOwnerRule", "sharingOwnerRules", "sharingOwnerRule"),
    ("SharingTerritoryRule", "sharingTerritoryRules", "sharingTerritoryRule"),
    ("BotVersion", "botVersions", "botVersion"),
    ("ManagedTopic", "managedTopics", "managedTopic"),
];

/// Types the platform lists but cannot query or retrieve; dropped entirely.
const UNSUPPORTED_TYPES: &[&str] = &[
    "EmbeddedServiceFieldService",
    "ManagedContentType",
    "RecordActionDeployment",
];

/// Bundle roots: one directory per logical member, internals not
/// individually addressable.
const BUNDLE_DIRECTORIES: &[&str] = &["aura", "lwc"];

const TRANSLATION_BUNDLE_DIRECTORY: &str = "objectTranslations";
const TERRITORY_MODEL_DIRECTORY: &str = "territory2Models";

/// Immutable lookup tables over the descriptor list.
#[derive(Debug)]
pub struct TypeCatalog {
    by_directory: HashMap<String, Vec<TypeDescriptor>>,
    by_type: HashMap<String, TypeDescriptor>,
    child_types: HashSet<String>,
    folder_scoped_directories: HashSet<String>,
}

impl TypeCatalog {
    /// Build the catalog from the platform's descriptor list, synthesizing
    /// folder-container and child-collection descriptors and dropping
    /// unsupported types.
    pub fn build(descriptors: Vec<TypeDescriptor>) -> Self {
        let mut catalog = TypeCatalog {
            by_directory: HashMap::new(),
            by_type: HashMap::new(),
            child_types: HashSet::new(),
            folder_scoped_directories: HashSet::new(),
        };

        for descriptor in descriptors {
            if UNSUPPORTED_TYPES.contains(&descriptor.xml_name.as_str()) {
                continue;
            }
            if descriptor.in_folder {
                catalog
                    .folder_scoped_directories
                    .insert(descriptor.directory_name.clone());
                if let Some(folder_type) = folder_container_name(&descriptor.xml_name) {
                    catalog.register(TypeDescriptor {
                        directory_name: descriptor.directory_name.clone(),
                        xml_name: folder_type.to_string(),
                        suffix: Some(folder_suffix(folder_type)),
                        in_folder: false,
                        has_meta_file: true,
                        child_xml_names: Vec::new(),
                    });
                }
            }
            for child in &descriptor.child_xml_names {
                match child_directory(child) {
                    Some((dir, suffix)) => {
                        if !catalog.child_types.contains(child) {
                            catalog.child_types.insert(child.clone());
                            catalog.register(TypeDescriptor {
                                directory_name: dir.to_string(),
                                xml_name: child.clone(),
                                suffix: Some(suffix.to_string()),
                                in_folder: false,
                                has_meta_file: false,
                                child_xml_names: Vec::new(),
                            });
                        }
                    }
                    None => {
                        warn!(child = %child, parent = %descriptor.xml_name,
                            "child type missing from directory table, not classifiable");
                    }
                }
            }
            catalog.register(descriptor);
        }

        catalog
    }

    fn register(&mut self, descriptor: TypeDescriptor) {
        self.by_directory
            .entry(descriptor.directory_name.clone())
            .or_default()
            .push(descriptor.clone());
        self.by_type
            .insert(descriptor.xml_name.clone(), descriptor);
    }

    /// Resolve a directory (and file name, when the directory is shared by
    /// several types) to a descriptor. `None` means the caller must fall
    /// through to parent-directory resolution.
    pub fn lookup(&self, directory: &str, file_name: Option<&str>) -> Option<&TypeDescriptor> {
        let candidates = self.by_directory.get(directory)?;
        if candidates.len() == 1 {
            return candidates.first();
        }
        let file_name = file_name?;
        candidates
            .iter()
            .find(|d| matches_suffix(d, file_name))
    }

    pub fn by_type(&self, xml_name: &str) -> Option<&TypeDescriptor> {
        self.by_type.get(xml_name)
    }

    /// Whether a type was synthesized from a parent's child-collection list.
    pub fn is_child_type(&self, xml_name: &str) -> bool {
        self.child_types.contains(xml_name)
    }

    /// Element tag that holds a child collection inside the parent file.
    /// Identical to the child type's synthesized directory name.
    pub fn child_element_name(&self, child_type: &str) -> Option<&'static str> {
        child_directory(child_type).map(|(dir, _)| dir)
    }

    pub fn is_folder_scoped_directory(&self, directory: &str) -> bool {
        self.folder_scoped_directories.contains(directory)
    }

    pub fn is_bundle_directory(&self, directory: &str) -> bool {
        BUNDLE_DIRECTORIES.contains(&directory)
    }

    pub fn is_translation_bundle_directory(&self, directory: &str) -> bool {
        directory == TRANSLATION_BUNDLE_DIRECTORY
    }

    pub fn is_territory_model_directory(&self, directory: &str) -> bool {
        directory == TERRITORY_MODEL_DIRECTORY
    }

    /// Directory table snapshot, sorted, for inspection output.
    pub fn directories(&self) -> Vec<(&str, Vec<&str>)> {
        let mut out: Vec<(&str, Vec<&str>)> = self
            .by_directory
            .iter()
            .map(|(dir, descs)| {
                let mut names: Vec<&str> =
                    descs.iter().map(|d| d.xml_name.as_str()).collect();
                names.sort_unstable();
                (dir.as_str(), names)
            })
            .collect();
        out.sort_unstable_by_key(|(dir, _)| *dir);
        out
    }
}

/// Suffix match against a file name, tolerating the `-meta.xml` sidecar form.
fn matches_suffix(descriptor: &TypeDescriptor, file_name: &str) -> bool {
    let Some(suffix) = descriptor.suffix.as_deref() else {
        return false;
    };
    let base = file_name.strip_suffix("-meta.xml").unwrap_or(file_name);
    base.ends_with(&format!(".{}", suffix))
}

fn folder_container_name(xml_name: &str) -> Option<&'static str> {
    FOLDER_CONTAINER_TYPES
        .iter()
        .find(|(parent, _)| *parent == xml_name)
        .map(|(_, folder)| *folder)
}

fn folder_suffix(folder_type: &str) -> String {
    let mut chars = folder_type.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn child_directory(child_type: &str) -> Option<(&'static str, &'static str)> {
    CHILD_DIRECTORIES
        .iter()
        .find(|(name, _, _)| *name == child_type)
        .map(|(_, dir, suffix)| (*dir, *suffix))
}
