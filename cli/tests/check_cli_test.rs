use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const VALID: &str = r#"package com.example;

rule "Adult"
    salience 10
when
    $p : Person(age > 18)
then
    System.out.println($p);
end
"#;

const DUPLICATES: &str = r#"rule "Dup"
when
    Person()
then
    System.out.println("a");
end

rule "Dup"
when
    Order()
then
    System.out.println("b");
end
"#;

#[test]
fn clean_file_passes() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("valid.drl");
    fs::write(&path, VALID)?;

    let mut cmd = Command::cargo_bin("drl")?;
    cmd.args(["check", path.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0 error(s), 0 warning(s) in 1 file(s)"));

    Ok(())
}

#[test]
fn duplicate_rule_fails_with_status_one() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("dup.drl");
    fs::write(&path, DUPLICATES)?;

    let mut cmd = Command::cargo_bin("drl")?;
    cmd.args(["check", path.to_str().unwrap()]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("8:6: error [duplicate-name] Duplicate rule name 'Dup'"))
        .stdout(predicate::str::contains("[best-practice]"));

    let mut cmd = Command::cargo_bin("drl")?;
    cmd.args(["check", "--errors-only", path.to_str().unwrap()]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("[best-practice]").not());

    Ok(())
}

#[test]
fn json_output_lists_each_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let valid = dir.path().join("valid.drl");
    let dup = dir.path().join("dup.drl");
    fs::write(&valid, VALID)?;
    fs::write(&dup, DUPLICATES)?;

    let output = Command::cargo_bin("drl")?
        .args(["check", "--json", valid.to_str().unwrap(), dup.to_str().unwrap()])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let reports = reports.as_array().expect("array of file reports");
    assert_eq!(reports.len(), 2);
    assert!(reports[0]["diagnostics"].as_array().unwrap().is_empty());
    let categories: Vec<&str> = reports[1]["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["category"].as_str())
        .collect();
    assert!(categories.contains(&"duplicate-name"));

    Ok(())
}

#[test]
fn unreadable_input_exits_with_status_two() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.drl");

    let mut cmd = Command::cargo_bin("drl")?;
    cmd.args(["check", missing.to_str().unwrap()]);
    cmd.assert().code(2).stderr(predicate::str::contains("failed to read"));

    let path = dir.path().join("valid.drl");
    let config = dir.path().join("settings.json");
    fs::write(&path, VALID)?;
    fs::write(&config, "{ not json")?;

    let mut cmd = Command::cargo_bin("drl")?;
    cmd.args(["check", "--config", config.to_str().unwrap(), path.to_str().unwrap()]);
    cmd.assert().code(2).stderr(predicate::str::contains("invalid config"));

    Ok(())
}

#[test]
fn tree_prints_rules_as_json() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("valid.drl");
    fs::write(&path, VALID)?;

    let output = Command::cargo_bin("drl")?
        .args(["tree", path.to_str().unwrap()])
        .output()?;
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(result["tree"]["package"]["name"], "com.example");
    assert_eq!(result["tree"]["rules"][0]["name"], "\"Adult\"");
    assert_eq!(result["outcome"], "complete");

    Ok(())
}
