//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const REQUEST: &str = "Create a todo app with user accounts and shared lists";

/// Get the binary to test.
fn specrun() -> Command {
    let mut cmd = Command::cargo_bin("specrun").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Run the workflow offline in `dir`.
fn offline_run(dir: &assert_fs::TempDir) -> assert_cmd::assert::Assert {
    specrun()
        .current_dir(dir.path())
        .args(["run", REQUEST, "--yes", "--offline", "--dir"])
        .arg(dir.path())
        .assert()
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    specrun()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spec-driven development"));
}

#[test]
fn test_version_flag() {
    specrun()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_run_help_lists_flags() {
    specrun()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--skip-clarification"))
        .stdout(predicate::str::contains("--offline"));
}

#[test]
fn test_yes_and_no_conflict() {
    specrun().args(["run", REQUEST, "--yes", "--no"]).assert().failure();
}

// ============================================================================
// Classify & Roles Tests
// ============================================================================

#[test]
fn test_classify_triggering_message() {
    specrun()
        .args(["classify", "create a todo app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trigger workflow: yes"))
        .stdout(predicate::str::contains("Complexity: simple"));
}

#[test]
fn test_classify_plain_question() {
    specrun()
        .args(["classify", "what time is it"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trigger workflow: no"));
}

#[test]
fn test_roles_lists_default() {
    specrun()
        .arg("roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("assistant"))
        .stdout(predicate::str::contains("(default)"))
        .stdout(predicate::str::contains("developer"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_offline_run_creates_layout() {
    let temp = assert_fs::TempDir::new().unwrap();

    offline_run(&temp)
        .success()
        .stdout(predicate::str::contains("Workflow complete"))
        .stdout(predicate::str::contains("Quality score"));

    temp.child(".specrun/memory/constitution.md").assert(predicate::path::is_file());
    let specs = temp.path().join(".specrun/specs");
    let features: Vec<_> = std::fs::read_dir(&specs).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(features.len(), 1);

    let feature_dir = &features[0];
    assert!(feature_dir.file_name().unwrap().to_string_lossy().starts_with("feature-001-"));
    for file in ["spec.md", "plan.md", "tasks.md", "implementation.md", "metadata.json", "analysis.json"] {
        assert!(feature_dir.join(file).is_file(), "missing {file}");
    }
}

#[test]
fn test_run_skips_plain_question() {
    let temp = assert_fs::TempDir::new().unwrap();

    specrun()
        .current_dir(temp.path())
        .args(["run", "what time is it", "--yes", "--offline", "--dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("does not need the spec-driven workflow"));

    temp.child(".specrun").assert(predicate::path::missing());
}

#[test]
fn test_run_unknown_role() {
    let temp = assert_fs::TempDir::new().unwrap();

    specrun()
        .current_dir(temp.path())
        .args(["run", REQUEST, "--yes", "--offline", "--role", "wizard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown role"));
}

#[test]
fn test_local_config_sets_root_dir() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".specrun.toml").write_str("[general]\nroot_dir = \"docs\"\n").unwrap();

    offline_run(&temp).success();

    temp.child("docs/memory/constitution.md").assert(predicate::path::is_file());
    temp.child(".specrun").assert(predicate::path::missing());
}

// ============================================================================
// Feature Inspection Tests
// ============================================================================

#[test]
fn test_features_after_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    offline_run(&temp).success();

    specrun()
        .current_dir(temp.path())
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("feature-001-"))
        .stdout(predicate::str::contains("complete"))
        .stdout(predicate::str::contains(REQUEST));
}

#[test]
fn test_features_empty_project() {
    let temp = assert_fs::TempDir::new().unwrap();

    specrun()
        .current_dir(temp.path())
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("No features found"));
}

#[test]
fn test_analyze_json() {
    let temp = assert_fs::TempDir::new().unwrap();
    offline_run(&temp).success();

    let output = specrun()
        .current_dir(temp.path())
        .args(["analyze", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["quality_score"].as_f64().unwrap() >= 90.0);
    assert!(report["artifacts"]["specification"].is_object());
}

#[test]
fn test_analyze_rewrites_snapshot() {
    let temp = assert_fs::TempDir::new().unwrap();
    offline_run(&temp).success();

    let specs = temp.path().join(".specrun/specs");
    let feature_dir = std::fs::read_dir(&specs).unwrap().next().unwrap().unwrap().path();
    let snapshot = feature_dir.join("analysis.json");
    std::fs::remove_file(&snapshot).unwrap();

    specrun()
        .current_dir(temp.path())
        .args(["analyze", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quality score"));

    assert!(snapshot.is_file());
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert!(saved["quality_score"].as_f64().unwrap() >= 90.0);
}

#[test]
fn test_analyze_unknown_feature() {
    let temp = assert_fs::TempDir::new().unwrap();

    specrun()
        .current_dir(temp.path())
        .args(["analyze", "feature-042-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feature named"));
}

#[test]
fn test_checklist_after_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    offline_run(&temp).success();

    specrun()
        .current_dir(temp.path())
        .args(["checklist", "001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specification"))
        .stdout(predicate::str::contains("Passed"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_prints_toml() {
    let temp = assert_fs::TempDir::new().unwrap();

    specrun()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[workflow]"));
}

#[test]
fn test_completions_bash() {
    specrun()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("specrun"));
}
