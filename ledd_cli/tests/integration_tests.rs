//! Integration tests for the ledd binary.
//!
//! These tests verify end-to-end behavior including:
//! - Recalculation from prescription and profile files
//! - Report files and the JSON report on stdout
//! - Catalog listing and export
//! - Input error handling

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "Drug,Dose,Freq,Time1,Time2,Time3,Time4,Time5,Notes,LEDD,Category\n";

/// Helper to create a test directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the user's config file
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ledd"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn write_prescription(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("prescription.csv");
    fs::write(&path, format!("{}{}", HEADER, body)).expect("Failed to write prescription");
    path
}

fn write_profile(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("profile.json");
    fs::write(&path, json).expect("Failed to write profile");
    path
}

const PROFILE: &str = r#"{
    "wake": "06:00",
    "sleep": "23:00",
    "meals": { "breakfast": "07:00", "lunch": "12:00", "dinner": "18:00" },
    "symptoms": { "wearing_off": true }
}"#;

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Levodopa equivalent daily dose"));
}

#[test]
fn test_recalc_writes_report_files() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,4,,,,,,,,\nENTACAPONE,100,4,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);
    let out_dir = dir.join("out");

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total"))
        .stdout(predicate::str::contains("532.0"))
        .stdout(predicate::str::contains("Plan B (OFF-period targeted)"))
        .stdout(predicate::str::contains("Tot=532"))
        .stdout(predicate::str::contains("not a"));

    for name in [
        "report.json",
        "summary.csv",
        "transfer.txt",
        "plan_a.csv",
        "plan_b.csv",
        "plan_c.csv",
        "prescription.csv",
    ] {
        assert!(out_dir.join(name).exists(), "missing {}", name);
    }

    let summary = fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    assert!(summary.contains("532.0"));

    let plan_b = fs::read_to_string(out_dir.join("plan_b.csv")).unwrap();
    assert!(plan_b.starts_with("Time,Drug,Dose,Comment"));
    assert!(plan_b.contains("before breakfast"));

    let table = fs::read_to_string(out_dir.join("prescription.csv")).unwrap();
    assert!(table.contains("LDOPA_IR,100,4,,,,,,,400.0,LDOPA"));
}

#[test]
fn test_recalc_json_on_stdout() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,250,3,,,,,,,,\nMYSTERY,5,1,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);

    let output = cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--json")
        .arg("--dry-run")
        .output()
        .expect("Failed to run ledd");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON");

    assert_eq!(json["summary"]["total"], 750.0);
    let kinds: Vec<_> = json["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"single_dose_exceeded".to_string()));
    assert!(kinds.contains(&"unknown_drug".to_string()));
    // Entered doses are never altered
    assert_eq!(json["plans"]["plan_a"]["slots"][0]["dose"], 250.0);
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);
    let data_dir = dir.join("data");

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(!data_dir.exists());
}

#[test]
fn test_default_output_goes_to_data_dir() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);
    let data_dir = dir.join("data");

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let reports: Vec<_> = fs::read_dir(data_dir.join("reports"))
        .expect("reports directory not created")
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn test_missing_wake_still_reports_ledd() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(dir, r#"{ "sleep": "23:00" }"#);
    let out_dir = dir.join("out");

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("300.0"))
        .stdout(predicate::str::contains("Schedule not generated"));

    assert!(out_dir.join("summary.csv").exists());
    assert!(!out_dir.join("plan_a.csv").exists());
}

#[test]
fn test_malformed_prescription_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,a lot,3,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"));
}

#[test]
fn test_catalog_listing() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("LDOPA_IR"))
        .stdout(predicate::str::contains("ENTACAPONE"))
        .stdout(predicate::str::contains("MULTIPLY_LDOPA"));
}

#[test]
fn test_catalog_export_and_reload() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let export = dir.join("catalog.csv");

    cli(dir)
        .arg("catalog")
        .arg("--export")
        .arg(&export)
        .assert()
        .success();

    let text = fs::read_to_string(&export).unwrap();
    assert!(text.starts_with("DrugID,DisplayName,Category"));

    // Retire levodopa IR in the custom catalog; existing lines still resolve
    let edited = text.replacen(
        "LDOPA_IR,Levodopa/Carbidopa (IR),LDOPA,mg,DIRECT,1.0,1.0,200.0,1200.0,-,TRUE",
        "LDOPA_IR,Levodopa/Carbidopa (IR),LDOPA,mg,DIRECT,1.0,1.0,200.0,1200.0,-,FALSE",
        1,
    );
    assert_ne!(edited, text);
    fs::write(&export, edited).unwrap();

    cli(dir)
        .arg("catalog")
        .arg("--catalog")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("LDOPA_IR").not());

    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);
    cli(dir)
        .arg("recalc")
        .arg("--catalog")
        .arg(&export)
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("no longer in the active catalog"))
        .stdout(predicate::str::contains("300.0"));
}

#[test]
fn test_invalid_catalog_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let catalog = dir.join("catalog.csv");
    fs::write(
        &catalog,
        "DrugID,DisplayName,Category,Unit,LEDD_Mode,LEDD_Factor,LDOPA_Multiplier,MaxSingleDose_mg,MaxDailyDose_mg,Warnings,IsActive\n\
         LDOPA_IR,Levodopa,LDOPA,mg,DIRECT,1.0,1.0,400,200,-,TRUE\n",
    )
    .unwrap();

    cli(dir)
        .arg("catalog")
        .arg("--catalog")
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max single dose"));
}

#[test]
fn test_config_write_and_show() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .arg("config")
        .arg("--write")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved configuration"));

    let saved = fs::read_to_string(dir.join("config").join("ledd").join("config.toml"))
        .expect("config file not written");
    assert!(saved.contains("off_onset_lead_minutes = 30"));

    cli(dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("pre_meal_lead_minutes = 30"));
}

#[test]
fn test_log_level_flag_quiets_info() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);

    Command::new(assert_cmd::cargo::cargo_bin!("ledd"))
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--log-level")
        .arg("error")
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--dry-run")
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded").not());
}

#[test]
fn test_recalc_with_recorded_off_hours() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,3,,,,,,,,\n");
    let profile = write_profile(
        dir,
        r#"{ "wake": "06:00", "sleep": "23:00", "timeline": { "off_hours": [14, 15] } }"#,
    );

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("before recorded OFF at 14:00"));
}

#[test]
fn test_implausible_frequency_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let prescription = write_prescription(dir, "LDOPA_IR,100,1e12,,,,,,,,\n");
    let profile = write_profile(dir, PROFILE);

    cli(dir)
        .arg("recalc")
        .arg("--prescription")
        .arg(&prescription)
        .arg("--profile")
        .arg(&profile)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"));
}
