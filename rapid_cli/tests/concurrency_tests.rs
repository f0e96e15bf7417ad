//! Concurrency tests for the rrc binary.
//!
//! These tests verify that commands from several terminals at once:
//! - Serialize on the shift lock instead of overwriting each other
//! - Survive a `timer run` that keeps saving in the background

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use std::process::{Child, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rrc"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

/// Start `timer run` in real time without waiting for it
fn spawn_timer_run(data_dir: &Path, timer_id: &str, seconds: u64) -> Child {
    std::process::Command::new(assert_cmd::cargo::cargo_bin!("rrc"))
        .env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(["timer", "run", timer_id, "--seconds"])
        .arg(seconds.to_string())
        .stdout(Stdio::null())
        .spawn()
        .expect("Failed to spawn timer run")
}

fn read_shift(data_dir: &Path) -> Value {
    let contents =
        std::fs::read_to_string(data_dir.join("shift.json")).expect("Failed to read shift");
    serde_json::from_str(&contents).expect("Shift file is not valid JSON")
}

#[test]
fn test_cycle_during_timer_run_is_kept() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["timer", "start", "cpr", "--id", "cpr1"])
        .assert()
        .success();

    let mut run = spawn_timer_run(data_dir, "cpr1", 3);

    // Between the run's first and second sync
    thread::sleep(Duration::from_millis(1_500));
    cli(data_dir)
        .args(["timer", "cycle", "cpr1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Cycle 1 recorded"));

    let status = run.wait().expect("timer run did not finish");
    assert!(status.success());

    let shift = read_shift(data_dir);
    let timer = &shift["timers"]["timers"]["cpr1"];
    assert_eq!(timer["cycles"], 1, "cycle lost to a background save");
    assert_eq!(timer["elapsed_ms"], 3000);
}

#[test]
fn test_checklist_update_during_timer_run_is_kept() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["timer", "start", "code-blue", "--id", "code1"])
        .assert()
        .success();

    let mut run = spawn_timer_run(data_dir, "code1", 2);

    thread::sleep(Duration::from_millis(500));
    cli(data_dir)
        .args(["complete", "Secure Airway"])
        .assert()
        .success();

    assert!(run.wait().expect("timer run did not finish").success());

    let shift = read_shift(data_dir);
    let emergencies = shift["sessions"]["emergencies"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(emergencies.len(), 1);
    assert_eq!(emergencies[0]["completed_actions"][0], "Secure Airway");
    assert_eq!(shift["timers"]["timers"]["code1"]["elapsed_ms"], 2000);
}

#[test]
fn test_simultaneous_start_cpr_joins_one_emergency() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let presses = 6;
    let handles: Vec<_> = (0..presses)
        .map(|_| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli(&data_dir).arg("start-cpr").assert().success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("start-cpr thread panicked");
    }

    let shift = read_shift(&data_dir);
    let emergencies = shift["sessions"]["emergencies"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(emergencies.len(), 1, "each press must join the same code");

    let cpr_id = format!("cpr-{}", emergencies[0]["id"].as_str().unwrap());
    assert_eq!(shift["timers"]["timers"][&cpr_id]["cycles"], presses - 1);
}
