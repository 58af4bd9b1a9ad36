//! Output format helpers for the `describe` subtask.

use crate::error::CliError;
use clap::ValueEnum;
use serde::Serialize;

/// Document format for printed output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML, matching the spec-file layout.
    Yaml,
}

impl OutputFormat {
    /// Render `value` with a trailing newline.
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, CliError> {
        let mut output = match self {
            Self::Json => serde_json::to_string_pretty(value)?,
            Self::Yaml => serde_yaml_ng::to_string(value)?,
        };
        if !output.ends_with('\n') {
            output.push('\n');
        }
        Ok(output)
    }
}
