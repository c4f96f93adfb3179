//! CLI output contract tests.

use metadelta::tooling::cli::{CliContext, Commands};
use std::fs;
use tempfile::TempDir;

const CATALOG_JSON: &str = r#"{"metadataObjects":[
    {"directoryName":"classes","xmlName":"ApexClass","suffix":"cls","metaFile":true},
    {"directoryName":"objects","xmlName":"CustomObject","suffix":"object",
     "childXmlNames":["CustomField"]}
]}"#;

#[test]
fn diff_json_contract_has_required_fields() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let target = temp_dir.path().join("target");
    fs::create_dir_all(source.join("classes")).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("classes/A.cls"), "public class A {}").unwrap();
    let catalog = temp_dir.path().join("describe.json");
    fs::write(&catalog, CATALOG_JSON).unwrap();

    let cli = CliContext::new(None).unwrap();
    let output = cli
        .execute(&Commands::Diff {
            source,
            target,
            catalog,
            out: temp_dir.path().join("out"),
            prune: false,
            backup_dir: None,
            format: "json".to_string(),
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let summary = parsed.get("summary").expect("summary should exist");
    assert_eq!(summary.get("left_only").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(summary.get("right_only").and_then(|v| v.as_u64()), Some(0));
    assert!(summary.get("matching").and_then(|v| v.as_u64()).is_some());
    assert!(parsed.get("package").and_then(|v| v.as_str()).is_some());
    assert!(parsed.get("destructive").and_then(|v| v.as_str()).is_some());
    assert!(parsed
        .get("prune_candidates")
        .and_then(|v| v.as_array())
        .is_some());
}

#[test]
fn catalog_command_lists_synthesized_types() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = temp_dir.path().join("describe.json");
    fs::write(&catalog, CATALOG_JSON).unwrap();

    let cli = CliContext::new(None).unwrap();
    let output = cli
        .execute(&Commands::Catalog {
            catalog,
            members: None,
        })
        .unwrap();

    assert!(output.contains("classes/ -> ApexClass"));
    assert!(output.contains("objects/ -> CustomObject"));
    // Child types land under their fixed directory.
    assert!(output.contains("fields/ -> CustomField"));
}

#[test]
fn catalog_command_reports_member_counts() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = temp_dir.path().join("describe.json");
    fs::write(&catalog, CATALOG_JSON).unwrap();
    let members = temp_dir.path().join("members.json");
    fs::write(&members, r#"{"ApexClass":["A","B","C"]}"#).unwrap();

    let cli = CliContext::new(None).unwrap();
    let output = cli
        .execute(&Commands::Catalog {
            catalog,
            members: Some(members),
        })
        .unwrap();

    assert!(output.contains("classes/ -> ApexClass (3 existing members)"));
    assert!(output.contains("objects/ -> CustomObject (0 existing members)"));
}

#[test]
fn missing_catalog_snapshot_is_a_hard_error() {
    let cli = CliContext::new(None).unwrap();
    let err = cli
        .execute(&Commands::Catalog {
            catalog: std::path::PathBuf::from("/nonexistent/describe.json"),
            members: None,
        })
        .unwrap_err();
    assert!(err.to_string().contains("external call failed"));
}
