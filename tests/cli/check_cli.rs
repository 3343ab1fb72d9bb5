use predicates::prelude::predicate;
use serde_json::Value;
use tempfile::tempdir;

use crate::http_stub::{data_path, fixture_path};

#[test]
fn shipped_fixture_matches_sample_document() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("check")
        .arg("--fixture")
        .arg(fixture_path())
        .arg("--input")
        .arg(data_path("airlines-openapi.yaml"))
        .output()
        .expect("run check");
    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["matched"], true);
    assert_eq!(report["skipped_count"], 1);
    assert!(output.stderr.is_empty());
}

#[test]
fn mismatch_exits_two_with_report_on_stdout() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("check")
        .arg("--fixture")
        .arg(fixture_path())
        .args(["--scenario", "version", "--scenario", "info", "--from", "json"])
        .write_stdin(r#"{"openapi":"3.1.0","info":{"title":"AirlinesRatingApp API","version":"1.0","termsOfService":"http://airlinesratingapp.com/terms"}}"#)
        .output()
        .expect("run check");
    assert_eq!(output.status.code(), Some(2));
    let report: Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["scenario_count"], 2);
    assert_eq!(report["failed_count"], 1);
    assert_eq!(report["scenarios"][0]["outcomes"][0]["expected"], "3.0.0");
    assert_eq!(report["scenarios"][0]["outcomes"][0]["actual"], "3.1.0");
}

#[test]
fn invalid_fixture_exits_three() {
    let dir = tempdir().expect("tempdir");
    let fixture = dir.path().join("fixture.yaml");
    std::fs::write(
        &fixture,
        "version: \"1\"\nscenarios:\n  - name: a\n    expectations:\n      - { path: \"info[\", equals: 1 }\n",
    )
    .expect("write fixture");

    assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("check")
        .arg("--fixture")
        .arg(&fixture)
        .write_stdin("{}")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("input_usage_error"))
        .stderr(predicate::str::contains("invalid path expression"));
}

#[test]
fn emit_pipeline_reports_sources_and_steps() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("--emit-pipeline")
        .arg("check")
        .arg("--fixture")
        .arg(fixture_path())
        .arg("--input")
        .arg(data_path("airlines-openapi.yaml"))
        .output()
        .expect("run check");
    assert_eq!(output.status.code(), Some(0));
    let pipeline: Value = serde_json::from_slice(&output.stderr).expect("pipeline json");
    assert_eq!(pipeline["command"], "check");
    assert_eq!(pipeline["input"]["sources"][0]["label"], "fixture");
    assert_eq!(pipeline["input"]["sources"][0]["format"], "yaml");
    assert_eq!(pipeline["input"]["sources"][1]["label"], "document");
    assert_eq!(pipeline["steps"][0], "load_fixture");
}
