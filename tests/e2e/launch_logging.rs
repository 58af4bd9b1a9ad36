//! Launch logging E2E tests.

use std::io;
use std::process::{Command, Output};

fn run_with_env(args: &[&str], envs: &[(&str, &str)]) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_grounding_dino"));
    for (key, _) in std::env::vars() {
        if key.starts_with("GDINO_") {
            command.env_remove(key);
        }
    }
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output()
}

#[test]
fn launch_reports_pass_on_stderr() -> io::Result<()> {
    let output = run_with_env(&["describe", "--automl"], &[("GDINO_LOG", "info")])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "describe failed: {stderr}");
    assert!(stderr.contains("Execution status: PASS"));
    assert!(
        !String::from_utf8_lossy(&output.stdout).contains("Execution status"),
        "logs must stay off stdout"
    );

    Ok(())
}

#[test]
fn json_log_format_emits_json_lines() -> io::Result<()> {
    let output = run_with_env(
        &["describe"],
        &[("GDINO_LOG", "info"), ("GDINO_LOG_FORMAT", "json")],
    )?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "describe failed: {stderr}");
    let lines: Vec<&str> = stderr.lines().filter(|line| !line.trim().is_empty()).collect();
    assert!(!lines.is_empty());
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).map_err(io::Error::other)?;
        assert!(value.get("level").is_some(), "missing level: {line}");
    }

    Ok(())
}

#[test]
fn log_filter_silences_info() -> io::Result<()> {
    let output = run_with_env(&["describe"], &[("GDINO_LOG", "error")])?;

    assert!(output.status.success());
    assert!(output.stderr.is_empty());

    Ok(())
}
