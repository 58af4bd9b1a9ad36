//! Spec round-trip E2E tests: an effective config printed by `describe`
//! reloads to the same effective config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .unwrap_or(manifest_dir)
        .join("crates/config/tests/fixtures")
        .join(name)
}

fn describe_effective(spec: &Path, format: &str) -> io::Result<String> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_grounding_dino"));
    for (key, _) in std::env::vars() {
        if key.starts_with("GDINO_") {
            command.env_remove(key);
        }
    }
    let output = command
        .env("GDINO_LOG", "warn")
        .arg("-e")
        .arg(spec)
        .args(["describe", "--effective", "--format", format])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::other(format!("describe --effective failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn scratch_file(name: &str) -> io::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("gdino-e2e-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    Ok(dir.join(name))
}

#[test]
fn effective_yaml_round_trips() -> io::Result<()> {
    let first = describe_effective(&fixture_path("spec.valid.yaml"), "yaml")?;
    let reloaded = scratch_file("roundtrip.yaml")?;
    fs::write(&reloaded, &first)?;
    let second = describe_effective(&reloaded, "yaml")?;

    assert_eq!(first, second, "effective config should survive a reload");

    fs::remove_file(&reloaded)?;
    Ok(())
}

#[test]
fn effective_json_round_trips() -> io::Result<()> {
    let first = describe_effective(&fixture_path("spec.valid.json"), "json")?;
    let reloaded = scratch_file("roundtrip.json")?;
    fs::write(&reloaded, &first)?;
    let second = describe_effective(&reloaded, "json")?;

    assert_eq!(first, second, "effective config should survive a reload");

    fs::remove_file(&reloaded)?;
    Ok(())
}

#[test]
fn spec_without_model_section_yields_defaults() -> io::Result<()> {
    let output = describe_effective(&fixture_path("spec.no_model.yaml"), "json")?;
    let value: serde_json::Value = serde_json::from_str(&output).map_err(io::Error::other)?;

    assert_eq!(
        value.pointer("/model/log_scale").and_then(serde_json::Value::as_str),
        Some("none")
    );
    assert_eq!(
        value.pointer("/model/num_queries").and_then(serde_json::Value::as_i64),
        Some(900)
    );
    assert_eq!(
        value.pointer("/model/backbone").and_then(serde_json::Value::as_str),
        Some("swin_tiny_224_1k")
    );

    Ok(())
}
