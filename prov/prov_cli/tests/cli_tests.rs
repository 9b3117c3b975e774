use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn provctl() -> Command {
    Command::cargo_bin("provctl").unwrap()
}

fn write_policy(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write policy file");
    path
}

#[test]
fn test_lookup_prints_identifier() {
    provctl()
        .args(["lookup", "read"])
        .assert()
        .success()
        .stdout("0x8020000000000001\n");
}

#[test]
fn test_lookup_unknown_name_fails() {
    provctl()
        .args(["lookup", "no_such_type"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type name"));
}

#[test]
fn test_decode_relation() {
    provctl()
        .args(["decode", "0x8020_0000_0000_0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name:  read"))
        .stdout(predicate::str::contains("class: relation (used)"));
}

#[test]
fn test_decode_node_as_json() {
    let output = provctl()
        .args(["decode", "--json", "0x2000000000000100"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let decoded: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(decoded["name"], "file");
    assert_eq!(decoded["long"], false);
}

#[test]
fn test_decode_rejects_garbage() {
    provctl().args(["decode", "read"]).assert().failure();
}

#[test]
fn test_types_filters() {
    provctl()
        .args(["types", "--relations"])
        .assert()
        .success()
        .stdout(predicate::str::contains("memory_read"))
        .stdout(predicate::str::contains("  file\n").not());

    provctl()
        .args(["types", "--nodes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  file\n"))
        .stdout(predicate::str::contains("memory_read").not());
}

#[test]
fn test_policy_check() {
    let dir = TempDir::new().unwrap();
    let path = write_policy(
        &dir,
        "policy.toml",
        r#"
capture_all = true
node_filter = ["directory"]
relation_filter = ["search", "perm_check"]
"#,
    );

    provctl()
        .arg("policy")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("capture_all:     true"))
        .stdout(predicate::str::contains("node_filter:     directory"))
        .stdout(predicate::str::contains("relation_filter: search, perm_check"));
}

#[test]
fn test_policy_check_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    let path = write_policy(&dir, "policy.json", r#"{"node_filter": ["teapot"]}"#);

    provctl().arg("policy").arg(&path).assert().failure();
}

#[test]
fn test_demo_prints_records() {
    let output = provctl().arg("demo").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(!records.is_empty());
    assert!(records.iter().any(|r| r["kind"] == "relation"));
    assert!(records.iter().any(|r| r["kind"] == "node"));
}

#[test]
fn test_demo_disabled_policy_records_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_policy(&dir, "off.toml", "enabled = false\n");

    provctl()
        .arg("demo")
        .arg("--summary")
        .arg("--policy")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("records: 0 relations: 0 emitted: 0"));
}

#[test]
fn test_demo_capture_all_records_more() {
    let count = |extra: &[&str]| {
        let output = provctl()
            .arg("demo")
            .args(extra)
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap().lines().count()
    };

    assert!(count(&["--capture-all"]) >= count(&[]));
}
