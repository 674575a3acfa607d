//! Binary-level tests for the rekon CLI.

use assert_cmd::Command;
use predicates::prelude::*;

const PROFILES: &str = r#"{
    "vendors": [{
        "vendor_id": "acme",
        "signature": "ACME",
        "fields": [
            {"name": "invoice_no", "pattern": "INV-(\\d+)", "required": true},
            {"name": "total", "pattern": "Total: (\\d+\\.\\d+)", "value_type": "number"},
            {"name": "store", "pattern": "Store: (\\d+)"}
        ],
        "key_field": "invoice_no"
    }]
}"#;

fn rekon() -> Command {
    Command::cargo_bin("rekon").unwrap()
}

#[test]
fn profiles_command_validates_file() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = dir.path().join("profiles.json");
    std::fs::write(&profiles, PROFILES).unwrap();

    rekon()
        .arg("profiles")
        .arg(&profiles)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 valid vendor profile"));
}

#[test]
fn profiles_command_rejects_bad_regex() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = dir.path().join("profiles.json");
    std::fs::write(&profiles, PROFILES.replace("INV-(\\\\d+)", "INV-(\\\\d+")).unwrap();

    rekon()
        .arg("profiles")
        .arg(&profiles)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern"));
}

#[test]
fn process_command_emits_json() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = dir.path().join("profiles.json");
    std::fs::write(&profiles, PROFILES).unwrap();
    let invoice = dir.path().join("inv.txt");
    std::fs::write(&invoice, "ACME Invoice INV-4521 Total: 120.50 Store: 101").unwrap();

    rekon()
        .arg("process")
        .arg(&invoice)
        .arg("--profiles")
        .arg(&profiles)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"invoice_no\": \"4521\""))
        .stdout(predicate::str::contains("\"status\": \"complete\""));
}

#[test]
fn batch_command_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = dir.path().join("profiles.json");
    std::fs::write(&profiles, PROFILES).unwrap();

    for n in 1..=3 {
        std::fs::write(
            dir.path().join(format!("inv-{n}.txt")),
            format!("ACME Invoice INV-{n} Total: {n}0.00 Store: 101"),
        )
        .unwrap();
    }
    std::fs::write(
        dir.path().join("gold.csv"),
        "invoice_no,total\n1,10.00\n2,20.00\n3,99.99\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("stores.csv"), "store,email\n101,s101@example.com\n").unwrap();

    let report = dir.path().join("report.csv");
    rekon()
        .arg("batch")
        .arg(dir.path().join("inv-*.txt").to_str().unwrap())
        .arg("--profiles")
        .arg(&profiles)
        .arg("--gold")
        .arg(dir.path().join("gold.csv"))
        .arg("--directory")
        .arg(dir.path().join("stores.csv"))
        .arg("--output")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 successful, 0 failed"));

    let content = std::fs::read_to_string(&report).unwrap();
    assert!(content.lines().next().unwrap().starts_with("source,vendor,status,key"));
    assert_eq!(content.lines().count(), 4);
    assert!(content.contains("s101@example.com"));
    // INV-3 disagrees with gold.
    assert!(content.contains("mismatch"));
}
