//! Package descriptor rendering.
//!
//! Renders a sorted, de-duplicated manifest from one diff partition. The
//! output is meant to be read and audited by a human before it is applied:
//! every type block is preceded by a comment enumerating the contributing
//! files, their diff classification, byte delta, and last-modified time.

use crate::classify::ClassifiedMember;
use crate::xml::escape;
use std::collections::{BTreeMap, BTreeSet};

const XMLNS: &str = "http://soap.sforce.com/2006/04/metadata";

/// Types whose deletion API calls reliably fail; their destructive blocks
/// are emitted inert, wrapped in a comment, for manual handling.
const DESTRUCTIVE_EXCEPTIONS: &[&str] = &["Workflow", "FlowDefinition", "Translations"];

pub struct ManifestWriter {
    api_version: String,
}

impl ManifestWriter {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
        }
    }

    /// Render one result set as a package descriptor.
    ///
    /// With `destructive` set, exception types render comment-wrapped and
    /// folder markers are excluded entirely: folders usually cannot be
    /// deleted automatically and are left to manual review.
    pub fn render(&self, members: &[ClassifiedMember], destructive: bool) -> String {
        let mut grouped: BTreeMap<&str, Vec<&ClassifiedMember>> = BTreeMap::new();
        let mut excluded_folders: BTreeSet<&str> = BTreeSet::new();

        for member in members {
            if destructive && member.is_folder_marker {
                excluded_folders.insert(member.member_name.as_str());
                continue;
            }
            grouped
                .entry(member.type_descriptor.xml_name.as_str())
                .or_default()
                .push(member);
        }

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<Package xmlns=\"{}\">\n", XMLNS));

        for folder in &excluded_folders {
            out.push_str(&format!(
                "    <!-- folder '{}' not deleted; folder removal requires manual review -->\n",
                sanitize_comment(folder)
            ));
        }

        for (type_name, contributors) in &grouped {
            out.push_str(&audit_comment(type_name, contributors));
            let block = types_block(type_name, contributors);
            if destructive && DESTRUCTIVE_EXCEPTIONS.contains(type_name) {
                out.push_str(&format!(
                    "    <!-- {} members cannot be deleted through the deployment API;\n         apply these removals manually:\n{}    -->\n",
                    type_name,
                    sanitize_comment(&block)
                ));
            } else {
                out.push_str(&block);
            }
        }

        out.push_str(&format!("    <version>{}</version>\n", self.api_version));
        out.push_str("</Package>\n");
        out
    }
}

/// Human-readable provenance for one type block. Non-normative, safe to
/// strip.
fn audit_comment(type_name: &str, contributors: &[&ClassifiedMember]) -> String {
    let mut lines: Vec<String> = contributors
        .iter()
        .map(|m| {
            format!(
                "         {} [{}] delta {:+} bytes, modified {}",
                m.file_path.display(),
                m.classification.as_str(),
                m.diff_magnitude,
                m.last_modified.format("%Y-%m-%d %H:%M:%S UTC")
            )
        })
        .collect();
    lines.sort();
    lines.dedup();
    format!(
        "    <!-- {}:\n{}\n    -->\n",
        sanitize_comment(type_name),
        sanitize_comment(&lines.join("\n"))
    )
}

fn types_block(type_name: &str, contributors: &[&ClassifiedMember]) -> String {
    let unique: BTreeSet<&str> = contributors
        .iter()
        .map(|m| m.member_name.as_str())
        .collect();
    let mut block = String::new();
    block.push_str("    <types>\n");
    for member in unique {
        block.push_str(&format!("        <members>{}</members>\n", escape(member)));
    }
    block.push_str(&format!("        <name>{}</name>\n", escape(type_name)));
    block.push_str("    </types>\n");
    block
}

/// XML comments must not contain "--".
fn sanitize_comment(text: &str) -> String {
    text.replace("--", "- -")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDescriptor;
    use crate::types::DiffClassification;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn descriptor(xml_name: &str, directory: &str) -> TypeDescriptor {
        TypeDescriptor {
            directory_name: directory.to_string(),
            xml_name: xml_name.to_string(),
            suffix: None,
            in_folder: false,
            has_meta_file: false,
            child_xml_names: vec![],
        }
    }

    fn member(
        type_name: &str,
        directory: &str,
        name: &str,
        path: &str,
        classification: DiffClassification,
        folder_marker: bool,
    ) -> ClassifiedMember {
        ClassifiedMember {
            member_key: format!("{}/{}", directory, name),
            member_name: name.to_string(),
            file_path: PathBuf::from(path),
            content_hash: [0; 32],
            directory: directory.to_string(),
            is_folder_marker: folder_marker,
            type_descriptor: descriptor(type_name, directory),
            file_size: 10,
            last_modified: Utc::now(),
            classification,
            diff_magnitude: 0,
            anchor: String::new(),
        }
    }

    #[test]
    fn types_and_members_are_sorted_and_unique() {
        let members = vec![
            member("CustomObject", "objects", "Zeta", "objects/Zeta/Zeta.object-meta.xml", DiffClassification::LeftOnly, false),
            member("ApexClass", "classes", "B", "classes/B.cls", DiffClassification::LeftOnly, false),
            member("ApexClass", "classes", "A", "classes/A.cls", DiffClassification::Differ, false),
            // Same logical member via its sidecar path.
            member("ApexClass", "classes", "A", "classes/A.cls-meta.xml", DiffClassification::Differ, false),
        ];
        let rendered = ManifestWriter::new("58.0").render(&members, false);

        let apex = rendered.find("<name>ApexClass</name>").unwrap();
        let object = rendered.find("<name>CustomObject</name>").unwrap();
        assert!(apex < object);
        assert_eq!(rendered.matches("<members>A</members>").count(), 1);
        let a = rendered.find("<members>A</members>").unwrap();
        let b = rendered.find("<members>B</members>").unwrap();
        assert!(a < b);
        assert!(rendered.ends_with("</Package>\n"));
        assert!(rendered.contains("<version>58.0</version>"));
    }

    #[test]
    fn destructive_exception_type_renders_inert() {
        let members = vec![member(
            "Workflow",
            "workflows",
            "Account",
            "workflows/Account.workflow-meta.xml",
            DiffClassification::RightOnly,
            false,
        )];
        let rendered = ManifestWriter::new("58.0").render(&members, true);
        let comment_start = rendered.find("<!-- Workflow members cannot be deleted").unwrap();
        let comment_end = rendered[comment_start..].find("-->").unwrap() + comment_start;
        let types_pos = rendered.find("<types>").unwrap();
        assert!(types_pos > comment_start && types_pos < comment_end);
        // No active Workflow block outside the comment.
        assert!(rendered[comment_end..].find("<name>Workflow</name>").is_none());
    }

    #[test]
    fn exception_type_is_active_in_package_manifest() {
        let members = vec![member(
            "Workflow",
            "workflows",
            "Account",
            "workflows/Account.workflow-meta.xml",
            DiffClassification::Differ,
            false,
        )];
        let rendered = ManifestWriter::new("58.0").render(&members, false);
        assert!(rendered.contains("<name>Workflow</name>"));
        assert!(!rendered.contains("cannot be deleted"));
    }

    #[test]
    fn folder_markers_never_reach_destructive_output() {
        let members = vec![
            member(
                "ReportFolder",
                "reports",
                "Sales",
                "reports/Sales.reportFolder-meta.xml",
                DiffClassification::RightOnly,
                true,
            ),
            member(
                "Report",
                "reports",
                "Sales/Pipeline",
                "reports/Sales/Pipeline.report-meta.xml",
                DiffClassification::RightOnly,
                false,
            ),
        ];
        let rendered = ManifestWriter::new("58.0").render(&members, true);
        assert!(!rendered.contains("<name>ReportFolder</name>"));
        assert!(!rendered.contains("<members>Sales</members>"));
        assert!(rendered.contains("folder 'Sales' not deleted"));
        assert!(rendered.contains("<members>Sales/Pipeline</members>"));

        // The same folder marker stays active in the package manifest.
        let additive = ManifestWriter::new("58.0").render(&members, false);
        assert!(additive.contains("<name>ReportFolder</name>"));
    }

    #[test]
    fn audit_comment_carries_classification_and_delta() {
        let mut m = member(
            "ApexClass",
            "classes",
            "A",
            "classes/A.cls",
            DiffClassification::Differ,
            false,
        );
        m.diff_magnitude = -42;
        let rendered = ManifestWriter::new("58.0").render(&[m], false);
        assert!(rendered.contains("classes/A.cls [differ] delta -42 bytes"));
    }

    proptest! {
        #[test]
        fn members_are_strictly_sorted_ascending(names in proptest::collection::vec("[A-Za-z][A-Za-z0-9_]{0,12}", 1..20)) {
            let members: Vec<ClassifiedMember> = names
                .iter()
                .map(|n| member("ApexClass", "classes", n, &format!("classes/{}.cls", n), DiffClassification::LeftOnly, false))
                .collect();
            let rendered = ManifestWriter::new("58.0").render(&members, false);
            let listed: Vec<&str> = rendered
                .lines()
                .filter_map(|l| l.trim().strip_prefix("<members>"))
                .filter_map(|l| l.strip_suffix("</members>"))
                .collect();
            let mut expected: Vec<&str> = names.iter().map(String::as_str).collect();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(listed, expected);
        }
    }
}
