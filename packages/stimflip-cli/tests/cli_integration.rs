use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

fn stimflip() -> Command {
    let mut cmd = Command::cargo_bin("stimflip").unwrap();
    cmd.env_remove("STIMFLIP_TOLERANCE")
        .env_remove("STIMFLIP_REFRESH_RATE")
        .env_remove("STIMFLIP_CACHE_DIR");
    cmd
}

fn trial(idx: u32, start: f64, fps: f64) -> Value {
    let flips: Vec<f64> = (0..30).map(|i| start + i as f64 / fps).collect();
    json!({
        "trial_idx": idx,
        "stimulus": {"type": "stimulus.Trippy", "fps": fps},
        "start_frame_time": flips[0],
        "end_frame_time": flips[29],
        "flip_times": flips,
        "condition_hash": format!("cond{}", idx),
    })
}

/// Two trials at `fps`, half a second apart, inside a 10 s scan.
fn scan(session: u32, scan_idx: u32, fps: f64) -> Value {
    let second_start = 1.0 + 29.0 / 60.0 + 0.5;
    let frames: Vec<f64> = (0..50).map(|i| i as f64 * 0.2).collect();
    json!({
        "session": session,
        "scan_idx": scan_idx,
        "frames": {"frame_times": frames, "ndepths": 2},
        "behavior": {"pupil": [-0.5, 1.0], "treadmill": [0.0, 9.0]},
        "trials": [trial(0, 1.0, 60.0), trial(1, second_start, fps)],
    })
}

fn write_fixture(dir: &Path, name: &str, scans: Vec<Value>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json!({ "scans": scans }).to_string()).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    stimflip()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    stimflip()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stimflip"));
}

#[test]
fn test_help_flag() {
    stimflip()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stimulus flip-time reconstruction"));
}

// =============================================================================
// CONVERT SUBCOMMAND
// =============================================================================

#[test]
fn test_convert_outputs_conversion() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);

    let output = stimflip()
        .args(["convert", "--source", fixture.to_str().unwrap()])
        .args(["--session", "1", "--scan-idx", "2", "--quiet"])
        .assert()
        .success();

    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["key"]["session"], 1);
    assert_eq!(parsed["key"]["scan_idx"], 2);
    assert_eq!(parsed["time_offset"], 0.5);
    assert_eq!(parsed["trials"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["trials"][0]["start_time"], 1.5);
    assert_eq!(parsed["trials"][1]["condition_hash"], "cond1");

    let timestamps = parsed["stimulus_timestamps"].as_array().unwrap();
    let values: Vec<f64> = timestamps.iter().map(|v| v.as_f64().unwrap()).collect();
    assert!(values.windows(2).all(|w| w[1] > w[0]));
    assert!(values[0] <= 0.5 + 1e-9);
    let rate = parsed["empirical_refresh_rate"].as_f64().unwrap();
    assert!((rate - 60.0).abs() < 1e-6);
}

#[test]
fn test_convert_writes_output_file() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);
    let out = tmp.path().join("out.json");

    stimflip()
        .args(["convert", "--source", fixture.to_str().unwrap()])
        .args(["--session", "1", "--scan-idx", "2", "--compact"])
        .args(["-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("empirical refresh rate"));

    let content = std::fs::read_to_string(&out).unwrap();
    assert!(!content.contains('\n'));
    let parsed: Value = serde_json::from_str(&content).unwrap();
    assert!(parsed["id"].is_string());
}

#[test]
fn test_convert_uses_cache_on_second_run() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);
    let cache_dir = tmp.path().join("cache");

    let run = || {
        stimflip()
            .args(["convert", "--source", fixture.to_str().unwrap()])
            .args(["--session", "1", "--scan-idx", "2", "--quiet"])
            .args(["--cache-dir", cache_dir.to_str().unwrap()])
            .assert()
            .success()
    };

    let first = stdout_json(run().get_output());
    assert!(cache_dir.join("scans").join("1_2_timestamps.csv").is_file());
    let second = stdout_json(run().get_output());

    assert!(first["empirical_refresh_rate"].is_number());
    assert!(second["empirical_refresh_rate"].is_null());
    assert_eq!(first["stimulus_timestamps"], second["stimulus_timestamps"]);
}

#[test]
fn test_convert_cache_keeps_sources_apart() {
    let tmp = tempfile::tempdir().unwrap();
    let a = write_fixture(tmp.path(), "a.json", vec![scan(1, 2, 60.0)]);
    let b = write_fixture(tmp.path(), "b.json", vec![scan(1, 2, 30.0)]);
    let cache_dir = tmp.path().join("cache");

    let run = |fixture: &Path| {
        let output = stimflip()
            .args(["convert", "--source", fixture.to_str().unwrap()])
            .args(["--session", "1", "--scan-idx", "2", "--quiet"])
            .args(["--cache-dir", cache_dir.to_str().unwrap()])
            .assert()
            .success();
        stdout_json(output.get_output())
    };

    let from_a = run(a.as_path());
    let from_b = run(b.as_path());

    assert!(from_b["empirical_refresh_rate"].is_number());
    assert_ne!(from_a["stimulus_timestamps"], from_b["stimulus_timestamps"]);
    assert!(cache_dir.join("a").join("1_2_timestamps.csv").is_file());
    assert!(cache_dir.join("b").join("1_2_timestamps.csv").is_file());
}

#[test]
fn test_convert_does_not_cache_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);

    for _ in 0..2 {
        let output = stimflip()
            .current_dir(tmp.path())
            .args(["convert", "--source", fixture.to_str().unwrap()])
            .args(["--session", "1", "--scan-idx", "2", "--quiet"])
            .assert()
            .success();
        assert!(stdout_json(output.get_output())["empirical_refresh_rate"].is_number());
    }
}

#[test]
fn test_convert_missing_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);

    stimflip()
        .args(["convert", "--source", fixture.to_str().unwrap()])
        .args(["--session", "7", "--scan-idx", "7", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No data for key"));
}

#[test]
fn test_convert_missing_source() {
    stimflip()
        .args(["convert", "--source", "/nonexistent_dir_12345/scans.json"])
        .args(["--session", "1", "--scan-idx", "2"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_convert_precondition_failure_names_trial() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 25.0)]);

    stimflip()
        .args(["convert", "--source", fixture.to_str().unwrap()])
        .args(["--session", "1", "--scan-idx", "2", "--quiet"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("trial_idx=1"))
        .stderr(predicate::str::contains("not an integer multiple"));
}

#[test]
fn test_convert_rejects_bad_refresh_rate_from_env() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);

    stimflip()
        .env("STIMFLIP_REFRESH_RATE", "-5")
        .args(["convert", "--source", fixture.to_str().unwrap()])
        .args(["--session", "1", "--scan-idx", "2"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid parameter"));
}

// =============================================================================
// BATCH SUBCOMMAND
// =============================================================================

#[test]
fn test_batch_no_input() {
    stimflip()
        .arg("batch")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must be specified"));
}

#[test]
fn test_batch_dry_run_lists_json_files() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path(), "a.json", vec![scan(1, 1, 60.0)]);
    write_fixture(tmp.path(), "b.json", vec![scan(1, 2, 60.0)]);
    std::fs::write(tmp.path().join("notes.txt"), "").unwrap();

    let pattern = format!("{}/*", tmp.path().to_str().unwrap());
    stimflip()
        .args(["batch", "--glob", &pattern, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.json"))
        .stdout(predicate::str::contains("b.json"))
        .stdout(predicate::str::contains("notes.txt").not());
}

#[test]
fn test_batch_jsonl_to_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        tmp.path(),
        "scans.json",
        vec![scan(1, 1, 60.0), scan(1, 2, 30.0)],
    );

    let output = stimflip()
        .args(["batch", "--files", fixture.to_str().unwrap()])
        .args(["--quiet", "--jobs", "2"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let lines: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["key"]["scan_idx"], 1);
    assert_eq!(lines[1]["key"]["scan_idx"], 2);
}

#[test]
fn test_batch_partial_failure_writes_good_scans() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        tmp.path(),
        "scans.json",
        vec![scan(1, 1, 60.0), scan(1, 2, 25.0)],
    );
    let out_dir = tmp.path().join("out");

    stimflip()
        .args(["batch", "--files", fixture.to_str().unwrap()])
        .args(["--output-dir", out_dir.to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Batch complete: 1 scan(s) succeeded, 1 failed"));

    assert!(out_dir.join("1_1_conversion.json").is_file());
    assert!(!out_dir.join("1_2_conversion.json").exists());
}

#[test]
fn test_batch_stops_after_failed_file() {
    let tmp = tempfile::tempdir().unwrap();
    let bad = write_fixture(tmp.path(), "a.json", vec![scan(1, 1, 25.0)]);
    let good = write_fixture(tmp.path(), "b.json", vec![scan(1, 2, 60.0)]);

    stimflip()
        .args(["batch", "--files", bad.to_str().unwrap(), good.to_str().unwrap()])
        .args(["--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());

    stimflip()
        .args(["batch", "--files", bad.to_str().unwrap(), good.to_str().unwrap()])
        .args(["--quiet", "--continue-on-error"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"scan_idx\":2"));
}

#[test]
fn test_batch_scan_selection() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        tmp.path(),
        "scans.json",
        vec![scan(1, 1, 60.0), scan(1, 2, 25.0)],
    );

    let output = stimflip()
        .args(["batch", "--files", fixture.to_str().unwrap()])
        .args(["--scans", "1/1", "--quiet"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1);
}

// =============================================================================
// VALIDATE SUBCOMMAND
// =============================================================================

#[test]
fn test_validate_valid_fixture() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(tmp.path(), "scans.json", vec![scan(1, 2, 60.0)]);

    stimflip()
        .args(["validate", "--source", fixture.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 scan(s), 0 invalid"));
}

#[test]
fn test_validate_json_reports_invalid_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        tmp.path(),
        "scans.json",
        vec![scan(1, 1, 60.0), scan(1, 2, 25.0)],
    );

    let output = stimflip()
        .args(["validate", "--source", fixture.to_str().unwrap(), "--json"])
        .assert()
        .code(2);

    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["loaded"], true);
    let scans = parsed["scans"].as_array().unwrap();
    assert_eq!(scans.len(), 2);
    assert!(scans[0]["error"].is_null());
    assert_eq!(scans[0]["trials"], 2);
    assert!(scans[1]["error"].as_str().unwrap().contains("trial_idx=1"));
}

#[test]
fn test_validate_missing_file() {
    stimflip()
        .args(["validate", "--source", "/nonexistent_dir_12345/scans.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_validate_rejects_non_json() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("scans.csv");
    std::fs::write(&path, "").unwrap();

    stimflip()
        .args(["validate", "--source", path.to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unsupported file extension"));
}
