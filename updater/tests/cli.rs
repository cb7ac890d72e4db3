//! CLI tests that spawn the `updater` binary and check exit codes.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use updater::exit_codes;
use updater::io::config::{DEFAULT_CONFIG_PATH, UpdaterConfig, load_config, write_config};

fn updater(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_updater"))
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("spawn updater")
}

fn write_build_config(dir: &Path, program: &str, args: &[&str]) {
    let mut cfg = UpdaterConfig::default();
    cfg.build.program = program.to_string();
    cfg.build.args = args.iter().map(|a| a.to_string()).collect();
    write_config(&dir.join(DEFAULT_CONFIG_PATH), &cfg).expect("write config");
}

#[test]
fn init_writes_default_config_once() {
    let temp = tempfile::tempdir().expect("tempdir");

    let out = updater(temp.path(), &["init"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let path = temp.path().join(DEFAULT_CONFIG_PATH);
    assert_eq!(load_config(&path).expect("load"), UpdaterConfig::default());

    fs::write(&path, "[flags]\nwrite_build_log = true\n").expect("edit");
    let out = updater(temp.path(), &["init"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(load_config(&path).expect("load").flags.write_build_log);

    let out = updater(temp.path(), &["init", "--force"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(!load_config(&path).expect("load").flags.write_build_log);
}

#[test]
fn merge_into_missing_repository_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut cfg = UpdaterConfig::default();
    cfg.repository.path = "does-not-exist".into();
    write_config(&temp.path().join(DEFAULT_CONFIG_PATH), &cfg).expect("write config");

    let out = updater(temp.path(), &["merge", "feature", "--yes"]);
    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&out.stderr).contains("does not exist"));
}

#[test]
fn declined_merge_prompt_runs_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");

    let mut child = Command::new(env!("CARGO_BIN_EXE_updater"))
        .current_dir(temp.path())
        .args(["merge", "feature"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn updater");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"n\n")
        .expect("answer");
    let out = child.wait_with_output().expect("wait");

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Merge cancelled."));
    assert!(String::from_utf8_lossy(&out.stderr).contains("[y/N]"));
}

#[test]
fn build_with_missing_toolchain_reports_tool_missing() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_build_config(temp.path(), "updater-test-no-such-toolchain", &[]);

    let out = updater(temp.path(), &["build", "--json"]);
    assert_eq!(out.status.code(), Some(exit_codes::TOOL_MISSING));
    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["state"], "toolchain_missing");
    assert_eq!(report["success"], false);
}

#[cfg(unix)]
#[test]
fn failing_build_exits_with_build_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_build_config(temp.path(), "sh", &["-c", "exit 3"]);

    let out = updater(temp.path(), &["build"]);
    assert_eq!(out.status.code(), Some(exit_codes::BUILD_FAILED));
    assert!(String::from_utf8_lossy(&out.stderr).contains("exited with code 3"));
}
