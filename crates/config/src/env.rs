//! Environment overrides for schema fields.
//!
//! Every field can be overridden with `GDINO_MODEL_<FIELD>` where `<FIELD>`
//! is the field name in upper case (`GDINO_MODEL_NUM_QUERIES=300`). Parsing
//! is strict: unknown variables, empty values and literals of the wrong kind
//! fail fast.

use crate::field::{FieldKind, FieldValue};
use crate::record::ConfigRecord;
use crate::schema::ConfigSchema;
use crate::validate::ConfigValidationError;
use gdino_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of model override variables.
pub const ENV_MODEL_PREFIX: &str = "GDINO_MODEL_";

/// Env var name for a field.
#[must_use]
pub fn env_var_name(field: &str) -> String {
    format!("{ENV_MODEL_PREFIX}{}", field.to_ascii_uppercase())
}

/// Parsed env overrides in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelEnv {
    overrides: Vec<(Box<str>, FieldValue)>,
}

impl ModelEnv {
    /// Parse overrides from a key/value map (useful for tests and fixtures).
    /// Keys without the prefix are ignored.
    pub fn from_map(
        schema: &ConfigSchema,
        map: &BTreeMap<String, String>,
    ) -> Result<Self, EnvParseError> {
        let by_var: BTreeMap<String, (usize, FieldKind, &str)> = schema
            .iter()
            .enumerate()
            .map(|(idx, field)| (env_var_name(field.name()), (idx, field.kind(), field.name())))
            .collect();

        let mut parsed = Vec::new();
        for (var, raw) in map.range(ENV_MODEL_PREFIX.to_owned()..) {
            if !var.starts_with(ENV_MODEL_PREFIX) {
                break;
            }
            let Some((idx, kind, name)) = by_var.get(var) else {
                return Err(EnvParseError::UnknownVariable { var: var.clone() });
            };
            if raw.trim().is_empty() {
                return Err(EnvParseError::EmptyValue { var: var.clone() });
            }
            let value = FieldValue::parse_literal(*kind, raw).map_err(|_| {
                EnvParseError::InvalidValue {
                    var: var.clone(),
                    value: raw.clone(),
                    expected: *kind,
                }
            })?;
            parsed.push((*idx, Box::<str>::from(*name), value));
        }

        parsed.sort_by_key(|(idx, _, _)| *idx);
        Ok(Self {
            overrides: parsed
                .into_iter()
                .map(|(_, name, value)| (name, value))
                .collect(),
        })
    }

    /// Parse overrides from the current process environment.
    pub fn from_std_env(schema: &ConfigSchema) -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for (key, value) in std::env::vars_os() {
            let Some(var) = key.to_str() else {
                continue;
            };
            if !var.starts_with(ENV_MODEL_PREFIX) {
                continue;
            }
            let value = value
                .into_string()
                .map_err(|_| EnvParseError::InvalidUnicode { var: var.to_owned() })?;
            map.insert(var.to_owned(), value);
        }
        Self::from_map(schema, &map)
    }

    /// Override for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.overrides
            .iter()
            .find(|(name, _)| name.as_ref() == field)
            .map(|(_, value)| value)
    }

    /// Overrides in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.overrides
            .iter()
            .map(|(name, value)| (name.as_ref(), value))
    }

    /// Number of overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// True when no variable was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Apply env overrides on top of `record`.
pub fn apply_env_overrides(
    record: ConfigRecord,
    env: &ModelEnv,
) -> Result<ConfigRecord, ConfigValidationError> {
    if !env.is_empty() {
        tracing::debug!(count = env.len(), "applying env overrides");
    }
    record.apply_overrides(env.iter().map(|(name, value)| (name, value.clone())))
}

/// Env var parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// Prefixed variable names no field.
    UnknownVariable {
        /// Env var name.
        var: String,
    },
    /// Variable set to an empty string.
    EmptyValue {
        /// Env var name.
        var: String,
    },
    /// Value is not valid UTF-8.
    InvalidUnicode {
        /// Env var name.
        var: String,
    },
    /// Value does not parse as the field kind.
    InvalidValue {
        /// Env var name.
        var: String,
        /// Raw input value.
        value: String,
        /// Field kind.
        expected: FieldKind,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownVariable { .. } => ErrorCode::new("config", "unknown_env_var"),
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidUnicode { .. } | Self::InvalidValue { .. } => {
                ErrorCode::new("config", "invalid_env_value")
            },
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { var } => {
                write!(formatter, "{var} does not name a model field")
            },
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidUnicode { var } => write!(formatter, "{var} must be valid UTF-8"),
            Self::InvalidValue { var, expected, .. } => {
                write!(formatter, "{var} must be a {expected} literal")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::UnknownVariable { var }
            | EnvParseError::EmptyValue { var }
            | EnvParseError::InvalidUnicode { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidValue {
                var,
                value,
                expected,
            } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", value)
                .with_metadata("expected", expected.as_str()),
        }
    }
}
