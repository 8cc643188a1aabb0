//! CLI subprocess integration tests.
//!
//! These invoke the `dockhand` binary and check exit codes and output.
//! Nothing here needs a container engine: engine-backed commands are pointed
//! at a binary that does not exist.

use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};

const NO_ENGINE: &str = "dockhand-test-no-such-engine";

fn dockhand_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dockhand"));
    cmd.env("HOME", home)
        .env_remove("DOCKHAND_CONFIG")
        .env_remove("DOCKHAND_ENGINE")
        .env_remove("DOCKHAND_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    dockhand_bin(home).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--version"]);
    assert!(output.status.success(), "dockhand --version must exit 0");
    assert!(stdout(&output).contains("dockhand"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for cmd in ["image", "run", "volume", "probe", "doctor", "completions"] {
        assert!(out.contains(cmd), "help must list '{cmd}': {out}");
    }
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("dockhand"));
}

#[test]
fn cli_probe_existing_path_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let target = home.path().join("ready");
    std::fs::write(&target, b"").unwrap();
    let output = run(home.path(), &["probe", "path", &target.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("attempt 1"));
}

#[test]
fn cli_probe_missing_path_times_out() {
    let home = tempfile::tempdir().unwrap();
    let target = home.path().join("never");
    let output = run(
        home.path(),
        &[
            "probe",
            "path",
            &target.to_string_lossy(),
            "--attempts",
            "2",
            "--delay-ms",
            "1",
        ],
    );
    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("probe timeout"));
}

#[test]
fn cli_probe_port_open_and_closed() {
    let home = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let output = run(
        home.path(),
        &["--json", "probe", "port", "127.0.0.1", &port, "--attempts", "3"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["ready"], true);
    assert_eq!(json["attempt"], 1);

    drop(listener);
    let output = run(
        home.path(),
        &["probe", "port", "127.0.0.1", &port, "--delay-ms", "1"],
    );
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn cli_volume_create_prints_mount_spec() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("superdir");
    let output = run(
        home.path(),
        &[
            "--json",
            "volume",
            "create",
            "--dir",
            &dir.to_string_lossy(),
            "--target",
            "/data",
            "--relabel",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.is_dir());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["host_path"], &*dir.to_string_lossy());
    assert_eq!(json["mount"], format!("-v {}:/data:Z", dir.display()));
}

#[test]
fn cli_volume_create_without_target_prints_path_only() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("plain");
    let output = run(
        home.path(),
        &["volume", "create", "--dir", &dir.to_string_lossy()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), dir.to_string_lossy());
}

#[test]
fn cli_missing_engine_is_command_failure() {
    let home = tempfile::tempdir().unwrap();
    let output = run(
        home.path(),
        &["--engine", NO_ENGINE, "image", "inspect", "ahoj"],
    );
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains(NO_ENGINE));

    let output = run(
        home.path(),
        &["--engine", NO_ENGINE, "run", "ahoj", "--", "ls", "/"],
    );
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_engine_from_environment() {
    let home = tempfile::tempdir().unwrap();
    let output = dockhand_bin(home.path())
        .env("DOCKHAND_ENGINE", NO_ENGINE)
        .args(["image", "pull", "fedora", "--tag", "ahoj"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains(NO_ENGINE));
}

#[test]
fn cli_invalid_config_exits_two() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "engine = \"docker\"\nunknown_key = 1\n").unwrap();
    let output = run(
        home.path(),
        &["--config", &config.to_string_lossy(), "doctor"],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("config error"));

    let output = run(home.path(), &["--engine", "two words", "doctor"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_config_file_is_used() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join(".config/dockhand/config.toml");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, format!("engine = \"{NO_ENGINE}\"\n")).unwrap();

    let output = run(home.path(), &["image", "inspect", "ahoj"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains(NO_ENGINE));
}

#[test]
fn cli_doctor_json_reports_missing_engine() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--json", "--engine", NO_ENGINE, "doctor"]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["healthy"], false);
    assert!(json["checks"].as_array().unwrap().len() >= 3);
}
