use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Run the binary with config lookups confined to a scratch directory
fn isolated_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("transcript-fetch").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .env_remove("YOUTUBE_API_KEY")
        .env_remove("YOUTUBE_ACCESS_TOKEN")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();

    isolated_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("tiers"));
}

#[test]
fn tiers_are_listed_in_priority_order() {
    let dir = TempDir::new().unwrap();

    let output = isolated_cmd(&dir).arg("tiers").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let official = stdout.find("Official API").unwrap();
    let unofficial = stdout.find("Unofficial Library").unwrap();
    let audio = stdout.find("Audio Transcription").unwrap();
    assert!(official < unofficial && unofficial < audio);
}

#[test]
fn invalid_identifier_fails_with_diagnostic() {
    let dir = TempDir::new().unwrap();

    isolated_cmd(&dir)
        .args(["--quiet", "fetch", "not a video id"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("All methods failed"))
        .stderr(predicate::str::contains("invalid content identifier"));
}

#[test]
fn invalid_identifier_json_report_on_stdout() {
    let dir = TempDir::new().unwrap();

    let output = isolated_cmd(&dir)
        .args(["--quiet", "fetch", "not a video id", "--format", "json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], false);
    assert_eq!(report["method"], "AllFailed");
    assert_eq!(report["reasons"].as_array().map(Vec::len), Some(1));
}

#[test]
fn config_command_prints_location() {
    let dir = TempDir::new().unwrap();

    isolated_cmd(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));
}
