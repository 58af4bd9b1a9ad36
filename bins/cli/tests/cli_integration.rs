//! CLI integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_grounding_dino"));
    scrub_scoped_env(&mut command);
    command
}

fn run_cli(args: &[&str]) -> std::io::Result<Output> {
    cli().args(args).output()
}

fn scrub_scoped_env(command: &mut Command) {
    for (key, _) in std::env::vars() {
        if key.starts_with("GDINO_") {
            command.env_remove(key);
        }
    }
    command.env("GDINO_LOG", "warn");
}

fn fixture_path(relative: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .unwrap_or(manifest_dir)
        .join("crates")
        .join("config")
        .join("tests")
        .join("fixtures")
        .join(relative)
}

fn stdout_json(output: &Output) -> std::io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(std::io::Error::other)
}

#[test]
fn cli_version_runs() -> std::io::Result<()> {
    let output = run_cli(&["--version"])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("grounding_dino "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));

    Ok(())
}

#[test]
fn cli_help_lists_subtasks() -> std::io::Result<()> {
    let output = run_cli(&["--help"])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for name in ["train", "evaluate", "inference", "export", "describe"] {
        assert!(stdout.contains(name), "help is missing {name}: {stdout}");
    }

    Ok(())
}

#[test]
fn cli_unknown_subtask_is_a_usage_error() -> std::io::Result<()> {
    let output = run_cli(&["bogus"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("unknown subtask `bogus`"));
    assert!(stderr.contains("train, evaluate, inference, export, describe"));

    Ok(())
}

#[test]
fn cli_missing_subtask_is_a_usage_error() -> std::io::Result<()> {
    let output = run_cli(&[])?;

    assert_eq!(output.status.code(), Some(2));

    Ok(())
}

#[test]
fn cli_runner_subtask_requires_a_spec() -> std::io::Result<()> {
    let output = run_cli(&["train", "--epochs", "5"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("experiment spec file is required"));

    Ok(())
}

#[test]
fn cli_describe_prints_every_field() -> std::io::Result<()> {
    let output = run_cli(&["describe"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "describe failed: {stderr}");
    let value = stdout_json(&output)?;
    assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("model"));
    let fields = value
        .get("fields")
        .and_then(|v| v.as_array())
        .ok_or_else(|| std::io::Error::other("missing fields"))?;
    assert!(fields.iter().any(|field| {
        field.get("name").and_then(|v| v.as_str()) == Some("log_scale")
    }));

    Ok(())
}

#[test]
fn cli_describe_automl_lists_search_space() -> std::io::Result<()> {
    let output = run_cli(&["describe", "--automl"])?;

    assert!(output.status.success());
    let value = stdout_json(&output)?;
    let names: Vec<&str> = value
        .get("dimensions")
        .and_then(|v| v.as_array())
        .map(|dimensions| {
            dimensions
                .iter()
                .filter_map(|dimension| dimension.get("name").and_then(|v| v.as_str()))
                .collect()
        })
        .unwrap_or_default();
    assert!(names.contains(&"num_queries"));
    assert!(!names.contains(&"hidden_dim"));

    Ok(())
}

#[test]
fn cli_describe_json_schema_has_properties() -> std::io::Result<()> {
    let output = run_cli(&["describe", "--json-schema"])?;

    assert!(output.status.success());
    let value = stdout_json(&output)?;
    assert!(value.pointer("/properties/num_queries").is_some());

    Ok(())
}

#[test]
fn cli_describe_effective_applies_overrides() -> std::io::Result<()> {
    let spec = fixture_path("spec.valid.yaml");
    let output = cli()
        .arg("-e")
        .arg(&spec)
        .args(["describe", "--effective", "model.num_queries=300"])
        .output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "describe --effective failed: {stderr}");
    let value = stdout_json(&output)?;
    assert_eq!(
        value.pointer("/model/num_queries").and_then(serde_json::Value::as_i64),
        Some(300)
    );

    Ok(())
}

#[test]
fn cli_env_overrides_are_validated() -> std::io::Result<()> {
    let spec = fixture_path("spec.valid.yaml");
    let output = cli()
        .arg("-e")
        .arg(&spec)
        .args(["describe", "--effective"])
        .env("GDINO_MODEL_NUM_QUERIES", "0")
        .output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("num_queries"));

    Ok(())
}

#[test]
fn cli_describe_effective_rejects_malformed_log_scale() -> std::io::Result<()> {
    let spec = fixture_path("spec.valid.yaml");
    let output = cli()
        .arg("-e")
        .arg(&spec)
        .args(["describe", "--effective"])
        .env("GDINO_MODEL_LOG_SCALE", "sometimes")
        .output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2), "stderr: {stderr}");
    assert!(stderr.contains("log_scale"));
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn cli_describe_effective_yaml_quotes_two_stage_type() -> std::io::Result<()> {
    let spec = fixture_path("spec.valid.yaml");
    let output = cli()
        .arg("-e")
        .arg(&spec)
        .args(["describe", "--effective", "--format", "yaml", "model.two_stage_type=no"])
        .output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("two_stage_type: 'no'"), "{stdout}");

    Ok(())
}

#[cfg(unix)]
mod runner {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    const RUNNER_SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args.txt\"\nexit 3\n";

    fn runner_dir(test: &str) -> std::io::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!("gdino-cli-{test}-{}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        let script = dir.join("grounding_dino-train");
        fs::write(&script, RUNNER_SCRIPT)?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;
        Ok(dir)
    }

    #[test]
    fn cli_train_forwards_args_and_exit_code() -> std::io::Result<()> {
        let dir = runner_dir("forward")?;
        let spec = fixture_path("spec.valid.yaml");
        let output = cli()
            .arg("-e")
            .arg(&spec)
            .args(["train", "--epochs", "5", "model.num_queries=300"])
            .env("GDINO_RUNNER_DIR", &dir)
            .output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(output.status.code(), Some(3), "stderr: {stderr}");
        let args = fs::read_to_string(dir.join("args.txt"))?;
        let args: Vec<&str> = args.lines().collect();
        let spec_dir = spec
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert_eq!(
            args,
            [
                "--config-path",
                spec_dir.as_str(),
                "--config-name",
                "spec.valid.yaml",
                "--epochs",
                "5",
                "model.num_queries=300",
            ]
        );

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn cli_invalid_spec_never_starts_the_runner() -> std::io::Result<()> {
        let dir = runner_dir("invalid")?;
        let spec = fixture_path("spec.bad_backbone.yaml");
        let output = cli()
            .arg("-e")
            .arg(&spec)
            .arg("train")
            .env("GDINO_RUNNER_DIR", &dir)
            .output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(output.status.code(), Some(2), "stderr: {stderr}");
        assert!(stderr.contains("backbone"));
        assert!(!dir.join("args.txt").exists());

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn cli_malformed_log_scale_never_starts_the_runner() -> std::io::Result<()> {
        let dir = runner_dir("log-scale")?;
        let spec = fixture_path("spec.valid.yaml");
        let output = cli()
            .arg("-e")
            .arg(&spec)
            .args(["train", "model.log_scale=sometimes"])
            .env("GDINO_RUNNER_DIR", &dir)
            .output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(output.status.code(), Some(2), "stderr: {stderr}");
        assert!(stderr.contains("log_scale"));
        assert!(!dir.join("args.txt").exists());

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn cli_missing_runner_is_an_internal_error() -> std::io::Result<()> {
        let dir = runner_dir("missing")?;
        let spec = fixture_path("spec.valid.yaml");
        let output = cli()
            .arg("-e")
            .arg(&spec)
            .arg("export")
            .env("GDINO_RUNNER_DIR", &dir)
            .output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr.contains("entrypoint:runner_not_found"));

        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
