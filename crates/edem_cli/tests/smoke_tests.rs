//! CLI smoke tests: basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_edem"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--voice"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("edem_cli"),
        "Expected crate name in --version output"
    );
}

#[test]
fn test_invalid_config_does_not_panic() {
    let output = cli_bin()
        .arg("--config")
        .arg("/tmp/nonexistent_edem_config_12345.toml")
        .arg("--help")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn test_unknown_voice_is_rejected() {
    let output = cli_bin()
        .args(["--voice", "whisper", "--ephemeral"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
}

#[test]
fn test_ephemeral_session_walks_intake() {
    let mut child = cli_bin()
        .args(["--ephemeral", "--config", "/tmp/nonexistent_edem_config_12345.toml"])
        .env_remove("EDEM_MODE")
        .env_remove("EDEM_VOICE")
        .env_remove("EDEM_LOCALE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn");
    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all("сильная\nкогда меня не слышат\n5\nкомок в горле\nпустота\nquit\n".as_bytes())
            .expect("write stdin");
    }
    let output = child.wait_with_output().expect("failed to wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1] да"), "cost agreement buttons expected:\n{}", stdout);
    assert!(stdout.contains("Session "));
}
