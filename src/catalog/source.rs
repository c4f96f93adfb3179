//! Boundary traits for the platform catalog and member listings.
//!
//! The core never talks to the remote platform. It consumes descriptor and
//! member-name snapshots through these traits; the shipped implementations
//! read JSON files materialized by an external retrieval step.

use crate::catalog::TypeDescriptor;
use crate::error::DeltaError;
use serde::Deserialize;
use std::path::PathBuf;

/// Source of metadata type descriptors for one API version.
pub trait MetadataCatalogSource {
    fn describe(&self, api_version: &str) -> Result<Vec<TypeDescriptor>, DeltaError>;
}

/// Source of existing member names per type on the target.
pub trait MemberListSource {
    fn list_members(&self, type_name: &str) -> Result<Vec<String>, DeltaError>;
}

/// Shape of a materialized describe-metadata result.
#[derive(Debug, Deserialize)]
struct DescribeSnapshot {
    #[serde(rename = "metadataObjects")]
    metadata_objects: Vec<TypeDescriptor>,
}

/// Catalog source backed by a describe-result JSON snapshot on disk.
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataCatalogSource for JsonCatalogSource {
    fn describe(&self, api_version: &str) -> Result<Vec<TypeDescriptor>, DeltaError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            DeltaError::ExternalCall(format!(
                "catalog snapshot {} unreadable: {}",
                self.path.display(),
                e
            ))
        })?;
        let snapshot: DescribeSnapshot = serde_json::from_str(&raw).map_err(|e| {
            DeltaError::ExternalCall(format!(
                "catalog snapshot {} for API {} did not parse: {}",
                self.path.display(),
                api_version,
                e
            ))
        })?;
        Ok(snapshot.metadata_objects)
    }
}

/// Member-list source backed by a `type name -> [member names]` JSON map.
pub struct JsonMemberListSource {
    path: PathBuf,
}

impl JsonMemberListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MemberListSource for JsonMemberListSource {
    fn list_members(&self, type_name: &str) -> Result<Vec<String>, DeltaError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            DeltaError::ExternalCall(format!(
                "member list snapshot {} unreadable: {}",
                self.path.display(),
                e
            ))
        })?;
        let map: std::collections::HashMap<String, Vec<String>> = serde_json::from_str(&raw)
            .map_err(|e| {
                DeltaError::ExternalCall(format!(
                    "member list snapshot {} did not parse: {}",
                    self.path.display(),
                    e
                ))
            })?;
        Ok(map.get(type_name).cloned().unwrap_or_default())
    }
}
