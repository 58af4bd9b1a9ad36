//! Record validation against the schema's field rules and cross-field rules.

use crate::field::{FieldKind, FieldValue, RuleViolation};
use crate::record::ConfigRecord;
use crate::schema::CrossFieldRule;
use gdino_shared::{ErrorCode, ErrorEnvelope};
use serde::de::DeserializeOwned;
use std::fmt;
use std::ops::Deref;

/// A record (or a document feeding one) breaks a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// The section is not a mapping, or typed conversion failed.
    InvalidDocument {
        /// Section name.
        section: String,
        /// Failure detail.
        reason: String,
    },
    /// Key not declared by the schema.
    UnknownField {
        /// Section name.
        section: String,
        /// Unknown key.
        field: String,
    },
    /// Value kind differs from the declared kind.
    TypeMismatch {
        /// Field name.
        field: String,
        /// Declared kind.
        expected: FieldKind,
        /// Kind found.
        found: String,
    },
    /// Unset sentinel on a field that is not optional.
    MissingValue {
        /// Field name.
        field: String,
    },
    /// Numeric value outside the declared bounds.
    OutOfRange {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
        /// Declared bounds.
        bounds: String,
    },
    /// String value outside the declared options.
    NotInOptions {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
        /// Declared options.
        options: Vec<String>,
    },
    /// Numeric value fails the math condition.
    ConditionFailed {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
        /// Declared condition.
        condition: String,
    },
    /// `len(list) != count`.
    LengthMismatch {
        /// List field.
        list: String,
        /// Count field.
        count: String,
        /// Actual list length.
        len: usize,
        /// Value of the count field.
        expected: i64,
    },
    /// Literal could not be parsed or converted.
    InvalidValue {
        /// Field name.
        field: String,
        /// Raw value.
        value: String,
        /// Failure detail.
        reason: String,
    },
    /// Override token is malformed.
    InvalidOverride {
        /// Raw token.
        input: String,
        /// Expected shape.
        reason: &'static str,
    },
}

impl ConfigValidationError {
    fn from_violation(field: &str, value: &FieldValue, violation: RuleViolation) -> Self {
        let field = field.to_owned();
        match violation {
            RuleViolation::Missing => Self::MissingValue { field },
            RuleViolation::TypeMismatch { expected, found } => Self::TypeMismatch {
                field,
                expected,
                found: found.to_owned(),
            },
            RuleViolation::OutOfRange { bounds } => Self::OutOfRange {
                field,
                value: value.to_string(),
                bounds: bounds.to_string(),
            },
            RuleViolation::NotInOptions { options } => Self::NotInOptions {
                field,
                value: value.to_string(),
                options: options.iter().map(ToString::to_string).collect(),
            },
            RuleViolation::ConditionFailed { condition } => Self::ConditionFailed {
                field,
                value: value.to_string(),
                condition: condition.to_string(),
            },
        }
    }

    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        let code = match self {
            Self::InvalidDocument { .. } => "invalid_document",
            Self::UnknownField { .. } => "unknown_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::MissingValue { .. } => "missing_value",
            Self::OutOfRange { .. } => "out_of_range",
            Self::NotInOptions { .. } => "not_in_options",
            Self::ConditionFailed { .. } => "condition_failed",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidOverride { .. } => "invalid_override",
        };
        ErrorCode::new("config", code)
    }

    /// Rule identifier reported in error metadata.
    #[must_use]
    pub const fn rule(&self) -> &'static str {
        match self {
            Self::InvalidDocument { .. } => "document",
            Self::UnknownField { .. } => "known_field",
            Self::TypeMismatch { .. } => "type",
            Self::MissingValue { .. } => "required",
            Self::OutOfRange { .. } => "bounds",
            Self::NotInOptions { .. } => "valid_options",
            Self::ConditionFailed { .. } => "math_condition",
            Self::LengthMismatch { .. } => "length_matches",
            Self::InvalidValue { .. } => "literal",
            Self::InvalidOverride { .. } => "override_syntax",
        }
    }

    /// Field the error refers to, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::MissingValue { field }
            | Self::OutOfRange { field, .. }
            | Self::NotInOptions { field, .. }
            | Self::ConditionFailed { field, .. }
            | Self::InvalidValue { field, .. } => Some(field),
            Self::LengthMismatch { list, .. } => Some(list),
            Self::InvalidDocument { .. } | Self::InvalidOverride { .. } => None,
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDocument { section, reason } => {
                write!(formatter, "invalid `{section}` section: {reason}")
            },
            Self::UnknownField { section, field } => {
                write!(formatter, "unknown field {section}.{field}")
            },
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(formatter, "{field} expects {expected} (got {found})"),
            Self::MissingValue { field } => write!(formatter, "{field} requires a value"),
            Self::OutOfRange {
                field,
                value,
                bounds,
            } => write!(formatter, "{field} must be within {bounds} (got {value})"),
            Self::NotInOptions {
                field,
                value,
                options,
            } => write!(
                formatter,
                "{field} must be one of [{}] (got {value:?})",
                options.join(", ")
            ),
            Self::ConditionFailed {
                field,
                value,
                condition,
            } => write!(formatter, "{field} must satisfy `{condition}` (got {value})"),
            Self::LengthMismatch {
                list,
                count,
                len,
                expected,
            } => write!(
                formatter,
                "{list} must have {count} = {expected} entries (got {len})"
            ),
            Self::InvalidValue {
                field,
                value,
                reason,
            } => write!(formatter, "invalid value {value:?} for {field}: {reason}"),
            Self::InvalidOverride { input, reason } => {
                write!(formatter, "invalid override {input:?}: {reason}")
            },
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl From<ConfigValidationError> for ErrorEnvelope {
    fn from(error: ConfigValidationError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message).with_metadata("rule", error.rule());
        if let Some(field) = error.field() {
            envelope = envelope.with_metadata("field", field);
        }

        match error {
            ConfigValidationError::InvalidDocument { section, .. }
            | ConfigValidationError::UnknownField { section, .. } => {
                envelope.with_metadata("section", section)
            },
            ConfigValidationError::OutOfRange { value, bounds, .. } => envelope
                .with_metadata("value", value)
                .with_metadata("bounds", bounds),
            ConfigValidationError::NotInOptions { value, options, .. } => envelope
                .with_metadata("value", value)
                .with_metadata("options", options.join(",")),
            ConfigValidationError::ConditionFailed {
                value, condition, ..
            } => envelope
                .with_metadata("value", value)
                .with_metadata("condition", condition),
            ConfigValidationError::LengthMismatch {
                count,
                len,
                expected,
                ..
            } => envelope
                .with_metadata("count_field", count)
                .with_metadata("len", len.to_string())
                .with_metadata("expected", expected.to_string()),
            ConfigValidationError::TypeMismatch {
                expected, found, ..
            } => envelope
                .with_metadata("expected", expected.as_str())
                .with_metadata("found", found),
            ConfigValidationError::InvalidValue { value, .. } => {
                envelope.with_metadata("value", value)
            },
            ConfigValidationError::InvalidOverride { input, .. } => {
                envelope.with_metadata("input", input)
            },
            ConfigValidationError::MissingValue { .. } => envelope,
        }
    }
}

/// Proof that a record passed [`validate_record`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord(ConfigRecord);

impl ValidatedRecord {
    /// Borrow the validated record.
    #[must_use]
    pub const fn as_record(&self) -> &ConfigRecord {
        &self.0
    }

    /// Consume the wrapper and return the record.
    #[must_use]
    pub fn into_inner(self) -> ConfigRecord {
        self.0
    }

    /// Deserialize the record into a typed holder.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigValidationError> {
        serde_json::from_value(self.0.to_json()).map_err(|error| {
            ConfigValidationError::InvalidDocument {
                section: self.0.schema().name().to_owned(),
                reason: error.to_string(),
            }
        })
    }
}

impl Deref for ValidatedRecord {
    type Target = ConfigRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ConfigRecord> for ValidatedRecord {
    fn as_ref(&self) -> &ConfigRecord {
        &self.0
    }
}

/// Check every field rule, then every cross-field rule, and return the first
/// violation. Values are never clamped or coerced.
pub fn validate_record(record: &ConfigRecord) -> Result<ValidatedRecord, ConfigValidationError> {
    match collect_violations(record).into_iter().next() {
        Some(error) => Err(error),
        None => {
            tracing::debug!(
                section = record.schema().name(),
                fields = record.schema().len(),
                "config record validated"
            );
            Ok(ValidatedRecord(record.clone()))
        },
    }
}

/// Every violation in the record, field rules first (in schema order), then
/// cross-field rules. Cross-field rules are only evaluated when all field
/// rules pass.
pub fn collect_violations(record: &ConfigRecord) -> Vec<ConfigValidationError> {
    let mut violations: Vec<ConfigValidationError> = record
        .iter()
        .filter_map(|(field, value)| {
            field
                .check(value)
                .err()
                .map(|violation| ConfigValidationError::from_violation(field.name(), value, violation))
        })
        .collect();

    if violations.is_empty() {
        violations.extend(
            record
                .schema()
                .cross_field_rules()
                .iter()
                .filter_map(|rule| check_cross_field(record, rule)),
        );
    }

    violations
}

fn check_cross_field(record: &ConfigRecord, rule: &CrossFieldRule) -> Option<ConfigValidationError> {
    match rule {
        CrossFieldRule::LengthMatches { list, count } => {
            let len = record.get(list).and_then(FieldValue::list_len)?;
            let expected = record.get(count).and_then(FieldValue::as_i64)?;
            if i64::try_from(len).ok() == Some(expected) {
                return None;
            }
            Some(ConfigValidationError::LengthMismatch {
                list: list.to_string(),
                count: count.to_string(),
                len,
                expected,
            })
        },
    }
}
