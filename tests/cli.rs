//! Integration tests for the rahukaal CLI

use std::process::{Command, Output};

fn rahukaal(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rahukaal"))
        .args(args)
        .env("RAHUKAAL_CACHE__ENABLED", "false")
        .env("RAHUKAAL_GEOCODING__ENABLED", "false")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute rahukaal")
}

#[test]
fn test_cli_help() {
    let output = rahukaal(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Daily Rahu Kaal windows"));
    for command in ["today", "forecast", "search", "watch", "serve"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_offline_today() {
    let output = rahukaal(&[
        "--offline",
        "--timezone",
        "Asia/Kolkata",
        "today",
        "--lat",
        "28.6139",
        "--lng",
        "77.2090",
        "--label",
        "New Delhi",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Rahu Kaal for New Delhi"));
    assert!(stdout.contains("Window"));
}

#[test]
fn test_offline_forecast_with_negative_coordinates() {
    let output = rahukaal(&[
        "--offline",
        "forecast",
        "--days",
        "10",
        "--lat",
        "-33.8688",
        "--lng",
        "151.2093",
        "--label",
        "Sydney",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("forecast for Sydney"));
    assert_eq!(stdout.lines().filter(|l| l.contains(" - ")).count(), 10);
}

#[test]
fn test_invalid_inputs_fail() {
    let output = rahukaal(&["--offline", "today", "--lat", "95", "--lng", "0"]);
    assert!(!output.status.success());

    let output = rahukaal(&["--timezone", "Mars/Olympus", "today"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown time zone"));

    let output = rahukaal(&["set-offset", "7"]);
    assert!(!output.status.success());
}

#[test]
fn test_default_location_is_logged_without_a_store() {
    let output = rahukaal(&["--offline", "today"]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cache kept in memory"), "{stderr}");
    assert!(stderr.contains("No saved location"), "{stderr}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Rahu Kaal for New Delhi"));
}
