// End-to-end tests for `pvcat classify` and friends over a fixture data directory.
// Run with: cargo test -p pvcat-cli --test classify_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn pvcat(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pvcat"));
    cmd.current_dir(cwd);
    cmd.env_remove("PVCAT_CONFIG");
    cmd.env_remove("PVCAT_DATA_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../catalog/tests/fixtures")
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, to.join(path.file_name().unwrap())).unwrap();
    }
}

/// A synced data directory laid out the way `pvcat sync` leaves it.
fn synced_data_dir(root: &Path) -> PathBuf {
    let fx = fixtures_dir();
    let data = root.join("data");
    let raw = data.join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::copy(fx.join("systems.csv"), raw.join("systems_20250729.csv")).unwrap();
    copy_dir(&fx.join("prize"), &raw.join("prize-metadata"));
    copy_dir(&fx.join("csv"), &raw.join("csv-metadata"));
    std::fs::create_dir_all(raw.join("parquet-metrics")).unwrap();
    std::fs::create_dir_all(raw.join("parquet-systems")).unwrap();
    std::fs::copy(fx.join("catalog/metrics.csv"), raw.join("parquet-metrics/metrics.csv")).unwrap();
    std::fs::copy(fx.join("catalog/systems.csv"), raw.join("parquet-systems/systems.csv")).unwrap();
    data
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn classify_no_probe_json() {
    let tmp = tempfile::tempdir().unwrap();
    synced_data_dir(tmp.path());

    let output = pvcat(tmp.path())
        .args(["classify", "--no-probe", "--json"])
        .output()
        .expect("failed to run pvcat");

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["probed"], false);
    assert_eq!(json["meta"]["horizon"], 2024);
    let summary = &json["summary"];
    assert_eq!(summary["total_systems"], 11);
    assert_eq!(summary["trusted_catalog_systems"], 3);
    assert_eq!(summary["orphans"], serde_json::json!([2045]));
    assert_eq!(summary["unknown_ids"]["lake_csv"], serde_json::json!([4242]));
    assert_eq!(summary["flag_counts"]["is_prize_data"], 5);
    assert_eq!(summary["first_year"]["probed"], 0);
    // inv_01_ac_power_inv_149593 in the 2105 prize document.
    assert!(summary["channel_hits"]["has_power_data"]["suffix"].as_u64().unwrap() >= 1);
    assert_eq!(summary["channel_hits"].as_object().unwrap().len(), 4);

    let written = tmp.path().join("data/core/systems_cleaned.csv");
    let text = std::fs::read_to_string(&written).unwrap();
    let mut lines = text.lines();
    assert!(lines
        .next()
        .unwrap()
        .starts_with("system_id,first_timestamp,first_year,is_prize_data,is_lake_parquet_data,is_lake_csv_data"));
    assert_eq!(lines.count(), 11);
    assert!(text.contains("\n2105,2016-10-01 00:00:00,2017,True,False,False,True,True,True,True,"));
}

#[test]
fn classify_output_flag_and_data_dir_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let data = synced_data_dir(tmp.path());
    let out = tmp.path().join("elsewhere/cleaned.csv");

    let output = pvcat(tmp.path())
        .args(["classify", "--no-probe", "--data-dir"])
        .arg(&data)
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(out.is_file());
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("11 systems"));
    assert!(stderr(&output).contains("channel matches:"));
}

#[test]
fn unexpected_orphans_exit_4() {
    let tmp = tempfile::tempdir().unwrap();
    synced_data_dir(tmp.path());
    std::fs::write(tmp.path().join("pvcat.toml"), "[reconcile]\nknown_orphans = []\n").unwrap();

    let output = pvcat(tmp.path()).args(["classify", "--no-probe"]).output().unwrap();

    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("identity mismatch"));
    assert!(!tmp.path().join("data/core/systems_cleaned.csv").exists());
}

#[test]
fn invalid_config_exit_3() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("custom.toml"), "[first_year]\nhorizon = \"soon\"\n").unwrap();

    let output = pvcat(tmp.path())
        .args(["classify", "--no-probe", "--config", "custom.toml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("custom.toml"));
}

#[test]
fn missing_data_dir_exit_5() {
    let tmp = tempfile::tempdir().unwrap();

    let output = pvcat(tmp.path()).args(["classify", "--no-probe"]).output().unwrap();

    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("pvcat sync"));
}

#[test]
fn fetch_requires_trailing_separator() {
    let tmp = tempfile::tempdir().unwrap();

    let output = pvcat(tmp.path())
        .args(["fetch", "data/raw", "pvdaq/csv/systems_20250729.csv"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("does not end in"));
    assert!(!tmp.path().join("data/raw").exists());
}
