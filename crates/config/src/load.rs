//! Spec-file loading helpers (file + dotted overrides + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::env::{ModelEnv, apply_env_overrides};
use crate::model::ModelConfig;
use crate::record::ConfigRecord;
use crate::schema::ConfigSchema;
use crate::validate::{ConfigValidationError, ValidatedRecord, validate_record};
use gdino_shared::{ErrorCode, ErrorEnvelope, ResultExt};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Spec-file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    /// `.json` (also the default when there is no extension).
    Json,
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
}

/// A `<section>.<field>=<value>` token taken from forwarded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedOverride {
    /// Field name.
    pub field: String,
    /// Raw literal.
    pub raw: String,
}

/// Load a record using a deterministic precedence order and validate it.
///
/// Precedence (highest wins):
/// - env overrides (`ModelEnv`)
/// - dotted overrides, in order
/// - the schema's section of the spec document
/// - field defaults
pub fn load_model_record(
    schema: Arc<ConfigSchema>,
    document: Option<&serde_json::Value>,
    overrides: &[DottedOverride],
    env: &ModelEnv,
) -> Result<ValidatedRecord, ErrorEnvelope> {
    let section_name = schema.name().to_owned();
    let mut record = ConfigRecord::from_defaults(schema);

    let section = match document {
        Some(document) => find_section(document, &section_name)?,
        None => None,
    };
    if let Some(section) = section {
        record = record.merge_json(section)?;
        tracing::debug!(section = %section_name, "merged spec section");
    }

    for entry in overrides {
        record = record.with_literal(&entry.field, &entry.raw)?;
        tracing::debug!(field = %entry.field, value = %entry.raw, "applied dotted override");
    }

    // env is applied last, then the merged record is validated.
    let record = apply_env_overrides(record, env)?;
    validate_record(&record).map_err(ErrorEnvelope::from)
}

/// Load a record from an optional spec file path.
pub fn load_model_record_from_path(
    schema: Arc<ConfigSchema>,
    spec_path: Option<&Path>,
    overrides: &[DottedOverride],
    env: &ModelEnv,
) -> Result<ValidatedRecord, ErrorEnvelope> {
    let document = spec_path.map(read_spec_document).transpose()?;
    load_model_record(schema, document.as_ref(), overrides, env).map_err(|error| match spec_path {
        Some(path) => error.with_metadata("path", path.to_string_lossy()),
        None => error,
    })
}

/// Load a record from std env and an optional spec file path.
pub fn load_model_record_std_env(
    schema: Arc<ConfigSchema>,
    spec_path: Option<&Path>,
    overrides: &[DottedOverride],
) -> Result<ValidatedRecord, ErrorEnvelope> {
    let env = ModelEnv::from_std_env(&schema).map_err(ErrorEnvelope::from)?;
    load_model_record_from_path(schema, spec_path, overrides, &env)
}

/// Load a record and convert it into [`ModelConfig`].
///
/// The typed conversion checks what field rules cannot express, such as the
/// `log_scale` syntax, so a record returned here is safe to hand to a runner.
pub fn load_model_config(
    schema: Arc<ConfigSchema>,
    spec_path: Option<&Path>,
    overrides: &[DottedOverride],
    env: &ModelEnv,
) -> Result<(ValidatedRecord, ModelConfig), ErrorEnvelope> {
    let record = load_model_record_from_path(schema, spec_path, overrides, env)?;
    let config = ModelConfig::from_validated(&record)
        .map_err(ErrorEnvelope::from)
        .map_err(|error| match spec_path {
            Some(path) => error.with_metadata("path", path.to_string_lossy()),
            None => error,
        })?;
    Ok((record, config))
}

/// [`load_model_config`] with env overrides read from std env.
pub fn load_model_config_std_env(
    schema: Arc<ConfigSchema>,
    spec_path: Option<&Path>,
    overrides: &[DottedOverride],
) -> Result<(ValidatedRecord, ModelConfig), ErrorEnvelope> {
    let env = ModelEnv::from_std_env(&schema).map_err(ErrorEnvelope::from)?;
    load_model_config(schema, spec_path, overrides, &env)
}

/// Read and parse a spec file (format chosen by extension).
pub fn read_spec_document(path: &Path) -> Result<serde_json::Value, ErrorEnvelope> {
    let format = detect_spec_format(path)?;
    let text = read_spec_file(path)?;
    parse_spec_document(&text, format).with_metadata("path", path.to_string_lossy())
}

/// Parse spec text into a JSON value.
pub fn parse_spec_document(input: &str, format: SpecFormat) -> Result<serde_json::Value, ErrorEnvelope> {
    match format {
        SpecFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid spec JSON: {error}"),
            )
        }),
        SpecFormat::Toml => {
            let invalid = |error: toml::de::Error| {
                ErrorEnvelope::expected(
                    ErrorCode::new("config", "invalid_toml"),
                    format!("invalid spec TOML: {error}"),
                )
            };
            let value: toml::Value = toml::from_str(input).map_err(invalid)?;
            reject_non_finite(toml_non_finite(&value, ""))?;
            serde_json::Value::deserialize(value).map_err(invalid)
        },
        SpecFormat::Yaml if input.trim().is_empty() => Ok(serde_json::Value::Null),
        SpecFormat::Yaml => {
            let invalid = |error: serde_yaml_ng::Error| {
                ErrorEnvelope::expected(
                    ErrorCode::new("config", "invalid_yaml"),
                    format!("invalid spec YAML: {error}"),
                )
            };
            let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(input).map_err(invalid)?;
            reject_non_finite(yaml_non_finite(&value, ""))?;
            serde_yaml_ng::from_value(value).map_err(invalid)
        },
    }
}

// JSON has no spelling for inf/nan; the other formats would collapse them to null.
fn reject_non_finite(path: Option<String>) -> Result<(), ErrorEnvelope> {
    match path {
        Some(path) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "non_finite_number"),
            format!("{path} must be a finite number"),
        )
        .with_metadata("field", path)),
        None => Ok(()),
    }
}

fn toml_non_finite(value: &toml::Value, path: &str) -> Option<String> {
    match value {
        toml::Value::Float(number) if !number.is_finite() => Some(path.to_owned()),
        toml::Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(idx, item)| toml_non_finite(item, &format!("{path}[{idx}]"))),
        toml::Value::Table(entries) => entries
            .iter()
            .find_map(|(key, item)| toml_non_finite(item, &join_key(path, key))),
        _ => None,
    }
}

fn yaml_non_finite(value: &serde_yaml_ng::Value, path: &str) -> Option<String> {
    use serde_yaml_ng::Value;

    match value {
        Value::Number(number) if number.is_nan() || number.is_infinite() => Some(path.to_owned()),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(idx, item)| yaml_non_finite(item, &format!("{path}[{idx}]"))),
        Value::Mapping(entries) => entries.iter().find_map(|(key, item)| {
            let key = match key {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => "?".to_owned(),
            };
            yaml_non_finite(item, &join_key(path, &key))
        }),
        Value::Tagged(tagged) => yaml_non_finite(&tagged.value, path),
        _ => None,
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

/// Pick the format from the file extension.
pub fn detect_spec_format(path: &Path) -> Result<SpecFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(SpecFormat::Json),
        Some("toml") => Ok(SpecFormat::Toml),
        Some("yaml" | "yml") => Ok(SpecFormat::Yaml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported spec format; use .yaml, .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

/// Collect `<section>.<field>=<value>` tokens (a leading `+` is tolerated).
/// Tokens outside the section are left to the runner and ignored here.
pub fn parse_dotted_overrides<S: AsRef<str>>(
    section: &str,
    args: &[S],
) -> Result<Vec<DottedOverride>, ConfigValidationError> {
    let prefix = format!("{section}.");
    args.iter()
        .map(|arg| arg.as_ref())
        .filter_map(|arg| {
            let body = arg.strip_prefix('+').unwrap_or(arg);
            body.strip_prefix(prefix.as_str()).map(|rest| (arg, rest))
        })
        .map(|(arg, rest)| match rest.split_once('=') {
            Some((field, raw)) if !field.trim().is_empty() => Ok(DottedOverride {
                field: field.trim().to_owned(),
                raw: raw.to_owned(),
            }),
            _ => Err(ConfigValidationError::InvalidOverride {
                input: arg.to_owned(),
                reason: "expected <section>.<field>=<value>",
            }),
        })
        .collect()
}

/// Render the record as a spec-file section in pretty JSON (trailing newline).
pub fn to_pretty_json(record: &ConfigRecord) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(&wrap_section(record)).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize record: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Render the record as a spec-file section in YAML (trailing newline).
pub fn to_pretty_yaml(record: &ConfigRecord) -> Result<String, ErrorEnvelope> {
    let mut output = serde_yaml_ng::to_string(&wrap_section(record)).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_yaml"),
            format!("failed to serialize record YAML: {error}"),
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(quote_yaml_11_booleans(&output))
}

// Plain scalars that YAML 1.1 readers load as booleans.
const YAML_11_BOOLEANS: [&str; 6] = ["y", "n", "yes", "no", "on", "off"];

/// Single-quote string scalars such as `no` so YAML 1.1 readers keep them as
/// strings. The serializer only quotes YAML 1.2 keywords.
fn quote_yaml_11_booleans(yaml: &str) -> String {
    let mut output = String::with_capacity(yaml.len());
    for line in yaml.lines() {
        let value_start = line.find(": ").map(|idx| idx + 2).or_else(|| {
            let item = line.trim_start();
            item.starts_with("- ").then(|| line.len() - item.len() + 2)
        });
        match value_start.and_then(|idx| line.split_at_checked(idx)) {
            Some((head, scalar))
                if YAML_11_BOOLEANS
                    .iter()
                    .any(|word| word.eq_ignore_ascii_case(scalar)) =>
            {
                output.push_str(head);
                output.push('\'');
                output.push_str(scalar);
                output.push('\'');
            },
            _ => output.push_str(line),
        }
        output.push('\n');
    }
    output
}

fn wrap_section(record: &ConfigRecord) -> serde_json::Value {
    let mut document = serde_json::Map::new();
    document.insert(record.schema().name().to_owned(), record.to_json());
    serde_json::Value::Object(document)
}

fn find_section<'a>(
    document: &'a serde_json::Value,
    name: &str,
) -> Result<Option<&'a serde_json::Value>, ErrorEnvelope> {
    match document {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(entries) => Ok(entries.get(name).filter(|value| !value.is_null())),
        _ => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_document"),
            "spec file must contain a mapping of sections",
        )),
    }
}

fn read_spec_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read spec file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{
        FieldValue, bool_field, float_field, int_field, int_list_field, str_field, str_list_field,
    };
    use crate::schema::CrossFieldRule;
    use serde_json::json;
    use std::error::Error;

    fn schema() -> Result<Arc<ConfigSchema>, Box<dyn Error>> {
        Ok(Arc::new(
            ConfigSchema::builder("model")
                .field(int_field("num_feature_levels", 4).range(1, 5).build()?)
                .field(int_list_field("return_interm_indices", [1, 2, 3, 4]).build()?)
                .field(float_field("dropout_ratio", 0.0).range(0.0, 1.0).build()?)
                .cross_field(CrossFieldRule::length_matches(
                    "return_interm_indices",
                    "num_feature_levels",
                ))
                .build()?,
        ))
    }

    #[test]
    fn detects_formats_by_extension() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_spec_format(Path::new("spec.yaml"))?, SpecFormat::Yaml);
        assert_eq!(detect_spec_format(Path::new("spec.YML"))?, SpecFormat::Yaml);
        assert_eq!(detect_spec_format(Path::new("spec.toml"))?, SpecFormat::Toml);
        assert_eq!(detect_spec_format(Path::new("spec"))?, SpecFormat::Json);

        let error = detect_spec_format(Path::new("spec.ini")).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
        Ok(())
    }

    #[test]
    fn parses_each_format_into_the_same_document() -> Result<(), Box<dyn Error>> {
        let yaml = parse_spec_document("model:\n  dropout_ratio: 0.5\n", SpecFormat::Yaml)?;
        let toml = parse_spec_document("[model]\ndropout_ratio = 0.5\n", SpecFormat::Toml)?;
        let json = parse_spec_document(r#"{"model": {"dropout_ratio": 0.5}}"#, SpecFormat::Json)?;

        assert_eq!(yaml, json);
        assert_eq!(toml, json);
        Ok(())
    }

    #[test]
    fn dotted_overrides_only_touch_the_section() -> Result<(), Box<dyn Error>> {
        let args = [
            "model.num_feature_levels=3",
            "+model.return_interm_indices=[1,2,3]",
            "train.num_epochs=10",
            "--gpus",
            "2",
        ];
        let overrides = parse_dotted_overrides("model", &args)?;

        assert_eq!(
            overrides,
            [
                DottedOverride {
                    field: "num_feature_levels".to_owned(),
                    raw: "3".to_owned(),
                },
                DottedOverride {
                    field: "return_interm_indices".to_owned(),
                    raw: "[1,2,3]".to_owned(),
                },
            ]
        );

        let error = parse_dotted_overrides("model", &["model.dropout_ratio"]).err();
        assert!(matches!(
            error,
            Some(ConfigValidationError::InvalidOverride { .. })
        ));
        Ok(())
    }

    #[test]
    fn precedence_is_defaults_file_overrides_env() -> Result<(), Box<dyn Error>> {
        let schema = schema()?;
        let document = json!({ "model": { "dropout_ratio": 0.1, "num_feature_levels": 3,
            "return_interm_indices": [1, 2, 3] } });
        let overrides = parse_dotted_overrides("model", &["model.dropout_ratio=0.2"])?;
        let env = ModelEnv::from_map(
            &schema,
            &[("GDINO_MODEL_DROPOUT_RATIO".to_owned(), "0.3".to_owned())].into(),
        )?;

        let no_env = ModelEnv::default();
        let from_file = load_model_record(Arc::clone(&schema), Some(&document), &[], &no_env)?;
        assert_eq!(from_file.get("dropout_ratio"), Some(&FieldValue::Float(0.1)));

        let with_override =
            load_model_record(Arc::clone(&schema), Some(&document), &overrides, &no_env)?;
        assert_eq!(with_override.get("dropout_ratio"), Some(&FieldValue::Float(0.2)));

        let with_env = load_model_record(schema, Some(&document), &overrides, &env)?;
        assert_eq!(with_env.get("dropout_ratio"), Some(&FieldValue::Float(0.3)));
        assert_eq!(with_env.get("num_feature_levels"), Some(&FieldValue::Int(3)));
        Ok(())
    }

    #[test]
    fn invalid_merges_surface_as_expected_errors() -> Result<(), Box<dyn Error>> {
        let document = json!({ "model": { "return_interm_indices": [1, 2, 3] } });
        let error = load_model_record(schema()?, Some(&document), &[], &ModelEnv::default()).err();

        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "length_mismatch"))
        );

        let error = load_model_record(schema()?, Some(&json!([1])), &[], &ModelEnv::default()).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "invalid_document"))
        );
        Ok(())
    }

    #[test]
    fn typed_load_rejects_what_field_rules_allow() -> Result<(), Box<dyn Error>> {
        let schema = crate::model::shared_model_schema()?;
        let overrides = parse_dotted_overrides("model", &["model.log_scale=sometimes"])?;

        let record =
            load_model_record_from_path(Arc::clone(&schema), None, &overrides, &ModelEnv::default())?;
        assert_eq!(
            record.get("log_scale"),
            Some(&FieldValue::Str("sometimes".to_owned()))
        );

        let error = load_model_config(Arc::clone(&schema), None, &overrides, &ModelEnv::default())
            .err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "invalid_document"))
        );

        let overrides = parse_dotted_overrides("model", &["model.log_scale=auto"])?;
        let (_, config) = load_model_config(schema, None, &overrides, &ModelEnv::default())?;
        assert_eq!(config.log_scale, crate::model::LogScale::Auto);
        Ok(())
    }

    #[test]
    fn missing_files_map_to_not_found() -> Result<(), Box<dyn Error>> {
        let error = load_model_record_from_path(
            schema()?,
            Some(Path::new("/definitely/missing/spec.yaml")),
            &[],
            &ModelEnv::default(),
        )
        .err();

        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "config_file_not_found"))
        );
        Ok(())
    }

    #[test]
    fn non_finite_numbers_are_reported_by_field() -> Result<(), Box<dyn Error>> {
        let error = parse_spec_document("model:\n  focal_alpha: .inf\n", SpecFormat::Yaml).err();
        let error = error.ok_or_else(|| std::io::Error::other("expected an error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "non_finite_number"));
        assert_eq!(
            error.metadata.get("field").map(String::as_str),
            Some("model.focal_alpha")
        );

        let error = parse_spec_document("[model]\nfocal_gamma = nan\n", SpecFormat::Toml).err();
        assert_eq!(
            error.and_then(|error| error.metadata.get("field").cloned()),
            Some("model.focal_gamma".to_owned())
        );

        let error =
            parse_spec_document("model:\n  weights: [0.5, -.inf]\n", SpecFormat::Yaml).err();
        assert_eq!(
            error.and_then(|error| error.metadata.get("field").cloned()),
            Some("model.weights[1]".to_owned())
        );

        let finite = parse_spec_document("model:\n  focal_alpha: 0.25\n", SpecFormat::Yaml)?;
        assert_eq!(finite, json!({ "model": { "focal_alpha": 0.25 } }));
        Ok(())
    }

    #[test]
    fn yaml_output_quotes_boolean_like_strings() -> Result<(), Box<dyn Error>> {
        let schema = Arc::new(
            ConfigSchema::builder("model")
                .field(
                    str_field("two_stage_type", "no")
                        .valid_options(["no", "standard"])
                        .build()?,
                )
                .field(str_list_field("flags", ["on", "labels"]).build()?)
                .field(str_field("mode", "y").build()?)
                .field(bool_field("aux_loss", true).build()?)
                .build()?,
        );
        let record = ConfigRecord::from_defaults(Arc::clone(&schema));
        let yaml = to_pretty_yaml(&record)?;

        assert!(yaml.contains("two_stage_type: 'no'\n"), "{yaml}");
        assert!(yaml.contains("- 'on'\n"), "{yaml}");
        assert!(yaml.contains("mode: 'y'\n"), "{yaml}");
        assert!(yaml.contains("aux_loss: true\n"), "{yaml}");
        assert!(yaml.contains("- labels\n"), "{yaml}");

        let document = parse_spec_document(&yaml, SpecFormat::Yaml)?;
        let reloaded = load_model_record(schema, Some(&document), &[], &ModelEnv::default())?;
        assert_eq!(reloaded.as_record(), &record);
        Ok(())
    }

    #[test]
    fn renders_section_with_trailing_newline() -> Result<(), Box<dyn Error>> {
        let record = ConfigRecord::from_defaults(schema()?);

        let json = to_pretty_json(&record)?;
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\"model\""));

        let yaml = to_pretty_yaml(&record)?;
        assert!(yaml.starts_with("model:\n"));
        assert!(yaml.ends_with('\n'));
        Ok(())
    }
}
