use std::error::Error;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn synthnet(dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("synthnet")?;
    cmd.env_remove("SYNTHNET_DB")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(dir.join("net.db"))
        .arg("--config")
        .arg(dir.join("config.toml"));
    Ok(cmd)
}

fn groups_json(dir: &Path) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
    let output = synthnet(dir)?.args(["groups", "--json"]).output()?;
    assert!(output.status.success());
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn commands_need_an_initialized_store() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    synthnet(tmp.path())?
        .args(["layer", "--width", "2", "--length", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn layers_connect_list_and_disconnect() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path();

    synthnet(dir)?
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized network store"));
    synthnet(dir)?
        .args(["layer", "--width", "10", "--length", "10"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("L1 10x10"));
    synthnet(dir)?
        .args(["layer", "--width", "10", "--length", "10", "--z", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("L2 10x10"));
    synthnet(dir)?
        .args(["layer", "--width", "2", "--length", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overlaps"));

    let connect = [
        "connect", "--from", "1", "--to", "2", "--type", "topographic",
        "--max-delay", "3", "--seed", "7", "--quiet",
    ];
    synthnet(dir)?
        .args(connect)
        .assert()
        .success()
        .stdout(predicate::str::contains("with 100 connections"));

    let groups = groups_json(dir)?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["connection_type"], "topographic");
    assert_eq!(groups[0]["connections"], 100);
    assert_eq!(groups[0]["parameters"]["max_delay"], 3);
    assert_eq!(groups[0]["parameters"]["parameters"]["Average weight"], 0.5);

    synthnet(dir)?
        .args(connect)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already connected"));
    assert_eq!(groups_json(dir)?.len(), 1);

    synthnet(dir)?
        .args(["disconnect", "--from", "1", "--to", "2", "--type", "topographic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1"));
    assert!(groups_json(dir)?.is_empty());
    Ok(())
}

#[test]
fn unknown_parameter_fails() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path();
    synthnet(dir)?.arg("init").assert().success();
    synthnet(dir)?.args(["layer", "--width", "3", "--length", "3"]).assert().success();

    synthnet(dir)?
        .args([
            "connect", "--from", "1", "--to", "1", "--type", "unstructured",
            "--param", "Spiral arms=3", "--quiet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Spiral arms"));
    assert!(groups_json(dir)?.is_empty());
    Ok(())
}

#[test]
fn import_matrix_builds_a_layer() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path();
    let matrix = dir.join("weights.csv");
    std::fs::write(&matrix, "0,0.5,0\n0,0,0.8\n0.2,0,0\n")?;

    synthnet(dir)?.arg("init").assert().success();
    synthnet(dir)?
        .arg("import-matrix")
        .arg(&matrix)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("holding 3 connections"));

    let groups = groups_json(dir)?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["from"], groups[0]["to"]);
    assert_eq!(groups[0]["connection_type"], "unstructured");
    Ok(())
}

#[test]
fn non_square_matrix_is_rejected() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path();
    let matrix = dir.join("weights.csv");
    std::fs::write(&matrix, "0,0.5\n0,0,0.8\n")?;

    synthnet(dir)?.arg("init").assert().success();
    synthnet(dir)?
        .arg("import")
        .arg(&matrix)
        .arg("--quiet")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rejected"));
    assert!(groups_json(dir)?.is_empty());
    Ok(())
}

#[test]
fn device_components_roundtrip() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let dir = tmp.path();
    synthnet(dir)?.arg("init").assert().success();

    synthnet(dir)?
        .args([
            "device", "add", "--id", "1", "--description", "Retina",
            "--receptor", "1:2", "--receptor", "2:1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("spans 3 rows"));
    synthnet(dir)?
        .args(["device", "show", "1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Retina").and(predicate::str::contains("receptor 2 rows 1")),
        );
    Ok(())
}

#[test]
fn types_lists_every_connection_type() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let output = synthnet(tmp.path())?.args(["types", "--json"]).output()?;
    assert!(output.status.success());

    let types: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(types.len(), 9);
    assert_eq!(types[3]["name"], "topographic");
    assert_eq!(types[4]["parameters"]["Connection density"], 0.1);
    Ok(())
}
