use std::fs;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn saved_settings_json() -> &'static str {
    r#"
{
  "cockpitWatchSettings": {
    "alarmTime": "06:45",
    "alarmSound": "pullup",
    "alarmEnabled": true,
    "format24h": false
  }
}
"#
}

#[test]
fn diagnostics_reports_clock_and_worker() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    fs::write(&settings, saved_settings_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--diagnostics")
        .arg("--settings")
        .arg(settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Clock source: SYSTEM_LOCAL"))
        .stdout(predicate::str::contains("Alarm: 06:45 (enabled)"))
        .stdout(predicate::str::contains("Background worker: cockpit-watch-v1.0.0"));
}

#[test]
fn diagnostics_without_background_reports_unavailable() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--diagnostics")
        .arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Background worker: unavailable"));
}

#[test]
fn malformed_json_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    fs::write(&settings, "{ not-valid-json ").expect("write invalid json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--print-settings")
        .arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn print_settings_fills_defaults_for_missing_keys() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    fs::write(&settings, saved_settings_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--print-settings")
        .arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""alarmTime": "06:45""#))
        .stdout(predicate::str::contains(r#""format24h": false"#))
        .stdout(predicate::str::contains(r#""timerMinutes": 5"#))
        .stdout(predicate::str::contains(r#""timerWarningSound": "warning""#));
}

#[test]
fn oversized_upload_is_rejected_and_nothing_saved() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    let audio = dir.path().join("huge.wav");
    fs::write(&audio, vec![0_u8; 12 * 1024 * 1024]).expect("write audio");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--upload-audio")
        .arg(&audio)
        .arg("--print-settings")
        .arg("--no-background")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("the limit is 10 MB"));
    assert!(!settings.exists());
}

#[test]
fn accepted_upload_is_persisted_as_data_uri() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    let audio = dir.path().join("ping.wav");
    fs::write(&audio, b"RIFF0000WAVE").expect("write audio");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--upload-audio")
        .arg(&audio)
        .arg("--print-settings")
        .arg("--no-background")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""customAudioName": "ping.wav""#));

    let saved = fs::read_to_string(&settings).expect("settings written");
    assert!(saved.contains("data:audio/wav;base64,"));
}

#[test]
fn unknown_audio_extension_needs_explicit_mime() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");
    let audio = dir.path().join("alert.bin");
    fs::write(&audio, b"data").expect("write audio");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--upload-audio")
        .arg(&audio)
        .arg("--no-background")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot tell the audio type"));
}

#[test]
fn stopwatch_counts_for_requested_ticks() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--mode")
        .arg("stopwatch")
        .arg("--start")
        .arg("--ticks")
        .arg("2")
        .arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("[STOPWATCH] 00:00:01"))
        .stdout(predicate::str::contains("STOP RESET"));
}

#[test]
fn setting_flags_are_saved() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--alarm-time")
        .arg("06:15")
        .arg("--alarm-enabled")
        .arg("true")
        .arg("--timer-minutes")
        .arg("2")
        .arg("--stopwatch-alarm-sound")
        .arg("radio")
        .arg("--print-settings")
        .arg("--no-background")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""alarmTime": "06:15""#))
        .stdout(predicate::str::contains(r#""alarmEnabled": true"#))
        .stdout(predicate::str::contains(r#""timerMinutes": 2"#));

    let saved = fs::read_to_string(&settings).expect("settings written");
    assert!(saved.contains(r#""stopwatchAlarmSound": "radio""#));
}

#[test]
fn invalid_setting_flag_fails() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--alarm-time")
        .arg("25:99")
        .arg("--no-background")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --alarm-time"))
        .stderr(predicate::str::contains("alarmTime"));
}

#[test]
fn keyboard_starts_the_stopwatch() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--mode")
        .arg("stopwatch")
        .arg("--ticks")
        .arg("2")
        .arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .write_stdin("s\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[STOPWATCH] 00:00:01"));
}

#[test]
fn quit_key_ends_an_open_ended_run() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    let mut cmd = cargo_bin_cmd!("cockpit-watch");
    cmd.arg("--no-background")
        .arg("--settings")
        .arg(settings)
        .write_stdin("t\nq\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("[TIMER    ] 00:05:00"));
}
