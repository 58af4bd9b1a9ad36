//! Field descriptors: a typed value plus its machine-readable validity contract.
//!
//! Descriptors are produced by one builder entry point per kind
//! ([`bool_field`], [`int_field`], [`float_field`], [`str_field`],
//! [`int_list_field`], [`str_list_field`]). Builders only expose the rules that
//! make sense for their kind (ranges for numbers, options for strings) and
//! `build()` rejects malformed contracts before a schema can be assembled.

use crate::condition::MathCondition;
use crate::schema::SchemaDefinitionError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Value type accepted by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `true` / `false`.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// List of integers.
    ListOfInt,
    /// List of strings.
    ListOfString,
}

impl FieldKind {
    /// Stable identifier used in serialized descriptors and error metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::ListOfInt => "list_of_int",
            Self::ListOfString => "list_of_string",
        }
    }

    /// Returns true for `Int` and `Float`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Returns true for the list kinds.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::ListOfInt | Self::ListOfString)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A concrete field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// The unset sentinel, serialized as `null`.
    Unset,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    Str(String),
    /// Integer list.
    IntList(Vec<i64>),
    /// String list.
    StrList(Vec<String>),
}

impl FieldValue {
    /// Kind carried by the value (`None` for the unset sentinel).
    #[must_use]
    pub const fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Unset => None,
            Self::Bool(_) => Some(FieldKind::Bool),
            Self::Int(_) => Some(FieldKind::Int),
            Self::Float(_) => Some(FieldKind::Float),
            Self::Str(_) => Some(FieldKind::String),
            Self::IntList(_) => Some(FieldKind::ListOfInt),
            Self::StrList(_) => Some(FieldKind::ListOfString),
        }
    }

    /// Type label used in mismatch errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.kind() {
            None => "null",
            Some(kind) => kind.as_str(),
        }
    }

    /// Returns true for the unset sentinel.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Numeric view of `Int` and `Float` values.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "math conditions compare integers against small float literals"
    )]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Length of list values.
    #[must_use]
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Self::IntList(values) => Some(values.len()),
            Self::StrList(values) => Some(values.len()),
            _ => None,
        }
    }

    /// Convert a JSON value into a field value of `kind`.
    ///
    /// `null` maps to [`FieldValue::Unset`] for every kind; whether that is
    /// acceptable is decided by the descriptor. Integers are accepted for
    /// float fields, the reverse is a mismatch.
    pub fn from_json(kind: FieldKind, value: &serde_json::Value) -> Result<Self, TypeMismatch> {
        use serde_json::Value;

        let mismatch = || TypeMismatch {
            expected: kind,
            found: json_type_name(value),
        };

        match (kind, value) {
            (_, Value::Null) => Ok(Self::Unset),
            (FieldKind::Bool, Value::Bool(flag)) => Ok(Self::Bool(*flag)),
            (FieldKind::Int, Value::Number(number)) => {
                number.as_i64().map(Self::Int).ok_or_else(mismatch)
            },
            (FieldKind::Float, Value::Number(number)) => {
                number.as_f64().map(Self::Float).ok_or_else(mismatch)
            },
            (FieldKind::String, Value::String(text)) => Ok(Self::Str(text.clone())),
            (FieldKind::ListOfInt, Value::Array(items)) => items
                .iter()
                .map(Value::as_i64)
                .collect::<Option<Vec<_>>>()
                .map(Self::IntList)
                .ok_or_else(mismatch),
            (FieldKind::ListOfString, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(Self::StrList)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }

    /// Parse a command-line or environment literal as a value of `kind`.
    ///
    /// Lists accept `[1, 2, 3]` or `1,2,3`; `null` and `~` are the unset
    /// sentinel for every kind.
    pub fn parse_literal(kind: FieldKind, raw: &str) -> Result<Self, LiteralError> {
        let trimmed = raw.trim();
        if trimmed == "null" || trimmed == "~" {
            return Ok(Self::Unset);
        }

        let error = || LiteralError {
            expected: kind,
            input: raw.to_owned(),
        };

        match kind {
            FieldKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Self::Bool(true)),
                "false" | "0" | "no" => Ok(Self::Bool(false)),
                _ => Err(error()),
            },
            FieldKind::Int => trimmed.parse().map(Self::Int).map_err(|_| error()),
            FieldKind::Float => match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Self::Float(value)),
                _ => Err(error()),
            },
            FieldKind::String => Ok(Self::Str(unquote(trimmed).to_owned())),
            FieldKind::ListOfInt => split_list(trimmed)
                .ok_or_else(error)?
                .into_iter()
                .map(|item| item.parse::<i64>().map_err(|_| error()))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::IntList),
            FieldKind::ListOfString => split_list(trimmed)
                .ok_or_else(error)
                .map(|items| {
                    items
                        .into_iter()
                        .map(|item| unquote(item).to_owned())
                        .collect()
                })
                .map(Self::StrList),
        }
    }

    /// JSON rendering of the value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Unset => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Int(value) => Value::from(*value),
            Self::Float(value) => Value::from(*value),
            Self::Str(text) => Value::String(text.clone()),
            Self::IntList(values) => Value::from(values.clone()),
            Self::StrList(values) => Value::from(values.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => formatter.write_str("null"),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Str(text) => formatter.write_str(text),
            Self::IntList(values) => write_list(formatter, values),
            Self::StrList(values) => write_list(formatter, values),
        }
    }
}

fn write_list<T: fmt::Display>(formatter: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    formatter.write_str("[")?;
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            formatter.write_str(", ")?;
        }
        write!(formatter, "{value}")?;
    }
    formatter.write_str("]")
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn unquote(input: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = input
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    input
}

fn split_list(input: &str) -> Option<Vec<&str>> {
    let inner = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(input)
        .trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let items: Vec<&str> = inner.split(',').map(str::trim).collect();
    if items.iter().any(|item| item.is_empty()) {
        return None;
    }
    Some(items)
}

/// A JSON value did not match the field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Kind declared by the descriptor.
    pub expected: FieldKind,
    /// JSON type that was found.
    pub found: &'static str,
}

/// A literal could not be parsed as the field kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    /// Kind declared by the descriptor.
    pub expected: FieldKind,
    /// Raw input.
    pub input: String,
}

/// Upper end of a numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit<T> {
    /// Inclusive finite maximum.
    Finite(T),
    /// No maximum; serialized as `"inf"`.
    Unbounded,
}

impl<T: Serialize> Serialize for Limit<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(value) => value.serialize(serializer),
            Self::Unbounded => serializer.serialize_str("inf"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Limit<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(formatter, "{value}"),
            Self::Unbounded => formatter.write_str("inf"),
        }
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    /// Inclusive minimum.
    pub min: T,
    /// Inclusive maximum or unbounded.
    pub max: Limit<T>,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    /// Returns true when `value` lies inside the range. NaN is never contained.
    pub fn contains(&self, value: T) -> bool {
        let above_min = value >= self.min;
        match self.max {
            Limit::Finite(max) => above_min && value <= max,
            Limit::Unbounded => above_min,
        }
    }

    fn is_ordered(&self) -> bool {
        match self.max {
            Limit::Finite(max) => self.min <= max,
            // Rejects a NaN minimum.
            Limit::Unbounded => self.min.partial_cmp(&self.min).is_some(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Bounds<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}, {}]", self.min, self.max)
    }
}

/// Bounds of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericBounds {
    /// Integer range.
    Int(Bounds<i64>),
    /// Float range.
    Float(Bounds<f64>),
}

impl NumericBounds {
    /// Returns true when `value` has the matching kind and lies in range.
    #[must_use]
    pub fn contains(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::Int(bounds), FieldValue::Int(value)) => bounds.contains(*value),
            (Self::Float(bounds), FieldValue::Float(value)) => bounds.contains(*value),
            _ => false,
        }
    }

    fn is_ordered(&self) -> bool {
        match self {
            Self::Int(bounds) => bounds.is_ordered(),
            Self::Float(bounds) => bounds.is_ordered(),
        }
    }
}

impl fmt::Display for NumericBounds {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(bounds) => write!(formatter, "{bounds}"),
            Self::Float(bounds) => write!(formatter, "{bounds}"),
        }
    }
}

/// A rule broken by a value.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleViolation {
    /// Unset sentinel on a field that is not optional.
    Missing,
    /// Value kind differs from the descriptor kind.
    TypeMismatch {
        /// Declared kind.
        expected: FieldKind,
        /// Kind found.
        found: &'static str,
    },
    /// Numeric value outside the declared bounds.
    OutOfRange {
        /// Declared bounds.
        bounds: NumericBounds,
    },
    /// String value not in the declared options.
    NotInOptions {
        /// Declared options.
        options: Vec<Box<str>>,
    },
    /// Numeric value fails the math condition.
    ConditionFailed {
        /// Declared condition.
        condition: MathCondition,
    },
}

impl RuleViolation {
    /// Stable rule identifier reported in error metadata.
    #[must_use]
    pub const fn rule(&self) -> &'static str {
        match self {
            Self::Missing => "required",
            Self::TypeMismatch { .. } => "type",
            Self::OutOfRange { .. } => "bounds",
            Self::NotInOptions { .. } => "valid_options",
            Self::ConditionFailed { .. } => "math_condition",
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => formatter.write_str("a value is required"),
            Self::TypeMismatch { expected, found } => {
                write!(formatter, "expected {expected}, found {found}")
            },
            Self::OutOfRange { bounds } => write!(formatter, "must be within {bounds}"),
            Self::NotInOptions { options } => {
                write!(formatter, "must be one of [{}]", options.join(", "))
            },
            Self::ConditionFailed { condition } => {
                write!(formatter, "must satisfy `{condition}`")
            },
        }
    }
}

/// Metadata record pairing a configuration value with its validity rules
/// and display hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    name: Box<str>,
    kind: FieldKind,
    value: FieldValue,
    default_value: FieldValue,
    optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<NumericBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_options: Option<Vec<Box<str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    math_condition: Option<MathCondition>,
    automl_eligible: bool,
    popular: bool,
    display_name: Box<str>,
    description: Box<str>,
}

impl FieldDescriptor {
    /// Field name as written in spec files.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Declared value.
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Value used when the user leaves the field unset.
    #[must_use]
    pub const fn default_value(&self) -> &FieldValue {
        &self.default_value
    }

    /// True when the unset sentinel is an accepted value.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Numeric bounds, if any.
    #[must_use]
    pub const fn bounds(&self) -> Option<&NumericBounds> {
        self.bounds.as_ref()
    }

    /// Allowed string values, if any.
    #[must_use]
    pub fn valid_options(&self) -> Option<&[Box<str>]> {
        self.valid_options.as_deref()
    }

    /// Extra numeric predicate, if any.
    #[must_use]
    pub const fn math_condition(&self) -> Option<&MathCondition> {
        self.math_condition.as_ref()
    }

    /// True when AutoML may search over this field.
    #[must_use]
    pub const fn is_automl_eligible(&self) -> bool {
        self.automl_eligible
    }

    /// UI prioritization hint.
    #[must_use]
    pub const fn is_popular(&self) -> bool {
        self.popular
    }

    /// Human-facing label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Human-facing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Check `value` against every rule of this descriptor.
    ///
    /// The unset sentinel (`null`, or the empty string on enum fields) passes
    /// only on optional fields.
    pub fn check(&self, value: &FieldValue) -> Result<(), RuleViolation> {
        if self.is_unset_sentinel(value) {
            return if self.optional {
                Ok(())
            } else {
                Err(RuleViolation::Missing)
            };
        }

        if value.kind() != Some(self.kind) {
            return Err(RuleViolation::TypeMismatch {
                expected: self.kind,
                found: value.type_name(),
            });
        }

        if let Some(bounds) = self.bounds {
            if !bounds.contains(value) {
                return Err(RuleViolation::OutOfRange { bounds });
            }
        }

        if let Some(condition) = self.math_condition {
            if !value.as_f64().is_some_and(|number| condition.holds(number)) {
                return Err(RuleViolation::ConditionFailed { condition });
            }
        }

        if let (Some(options), FieldValue::Str(text)) = (&self.valid_options, value) {
            if !options.iter().any(|option| option.as_ref() == text) {
                return Err(RuleViolation::NotInOptions {
                    options: options.clone(),
                });
            }
        }

        Ok(())
    }

    fn is_unset_sentinel(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Unset => true,
            FieldValue::Str(text) => text.is_empty() && self.valid_options.is_some(),
            _ => false,
        }
    }
}

/// Typed builder returned by the per-kind entry points.
#[derive(Debug, Clone)]
#[must_use]
pub struct FieldBuilder<T> {
    name: Box<str>,
    kind: FieldKind,
    value: FieldValue,
    default_value: Option<FieldValue>,
    bounds: Option<NumericBounds>,
    valid_options: Option<Vec<Box<str>>>,
    math_condition: Option<Box<str>>,
    automl_eligible: bool,
    popular: bool,
    display_name: Option<Box<str>>,
    description: Box<str>,
    marker: PhantomData<fn() -> T>,
}

/// Start a boolean field.
pub fn bool_field(name: &str, value: bool) -> FieldBuilder<bool> {
    FieldBuilder::new(name, FieldKind::Bool, FieldValue::Bool(value))
}

/// Start an integer field.
pub fn int_field(name: &str, value: i64) -> FieldBuilder<i64> {
    FieldBuilder::new(name, FieldKind::Int, FieldValue::Int(value))
}

/// Start a float field.
pub fn float_field(name: &str, value: f64) -> FieldBuilder<f64> {
    FieldBuilder::new(name, FieldKind::Float, FieldValue::Float(value))
}

/// Start a string field. A `None` value makes the field optional.
pub fn str_field<'a>(name: &str, value: impl Into<Option<&'a str>>) -> FieldBuilder<String> {
    let value = value
        .into()
        .map_or(FieldValue::Unset, |text| FieldValue::Str(text.to_owned()));
    FieldBuilder::new(name, FieldKind::String, value)
}

/// Start an integer-list field.
pub fn int_list_field(name: &str, value: impl IntoIterator<Item = i64>) -> FieldBuilder<Vec<i64>> {
    FieldBuilder::new(
        name,
        FieldKind::ListOfInt,
        FieldValue::IntList(value.into_iter().collect()),
    )
}

/// Start a string-list field.
pub fn str_list_field<'a>(
    name: &str,
    value: impl IntoIterator<Item = &'a str>,
) -> FieldBuilder<Vec<String>> {
    FieldBuilder::new(
        name,
        FieldKind::ListOfString,
        FieldValue::StrList(value.into_iter().map(str::to_owned).collect()),
    )
}

impl<T> FieldBuilder<T> {
    fn new(name: &str, kind: FieldKind, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            default_value: None,
            bounds: None,
            valid_options: None,
            math_condition: None,
            automl_eligible: false,
            popular: false,
            display_name: None,
            description: "".into(),
            marker: PhantomData,
        }
    }

    /// Human-facing label (defaults to the field name).
    pub fn display_name(mut self, text: &str) -> Self {
        self.display_name = Some(text.into());
        self
    }

    /// Human-facing description.
    pub fn description(mut self, text: &str) -> Self {
        self.description = text.into();
        self
    }

    /// Mark the field as an AutoML search dimension.
    pub const fn automl(mut self) -> Self {
        self.automl_eligible = true;
        self
    }

    /// Mark the field as popular for UI ordering.
    pub const fn popular(mut self) -> Self {
        self.popular = true;
        self
    }

    /// Validate the contract and freeze the descriptor.
    pub fn build(self) -> Result<FieldDescriptor, SchemaDefinitionError> {
        let field = self.name.to_string();
        if !is_valid_field_name(&self.name) {
            return Err(SchemaDefinitionError::InvalidName { field });
        }

        if let Some(bounds) = &self.bounds {
            if !bounds.is_ordered() {
                return Err(SchemaDefinitionError::InvalidBounds {
                    field,
                    bounds: bounds.to_string(),
                });
            }
        }

        if let Some(options) = &self.valid_options {
            if options.is_empty() {
                return Err(SchemaDefinitionError::EmptyOptions { field });
            }
            for (idx, option) in options.iter().enumerate() {
                if options.iter().skip(idx + 1).any(|other| other == option) {
                    return Err(SchemaDefinitionError::DuplicateOption {
                        field,
                        option: option.to_string(),
                    });
                }
            }
        }

        let math_condition = self
            .math_condition
            .as_deref()
            .map(|raw| {
                MathCondition::parse(raw).map_err(|error| {
                    SchemaDefinitionError::InvalidMathCondition {
                        field: field.clone(),
                        condition: raw.to_owned(),
                        reason: error.reason(),
                    }
                })
            })
            .transpose()?;

        if self.automl_eligible {
            let reason = match self.kind {
                FieldKind::ListOfInt | FieldKind::ListOfString => {
                    Some("list fields cannot be search dimensions")
                },
                FieldKind::String if self.valid_options.is_none() => {
                    Some("string dimensions need valid_options")
                },
                _ => None,
            };
            if let Some(reason) = reason {
                return Err(SchemaDefinitionError::AutomlUnsupported { field, reason });
            }
        }

        let optional = match &self.value {
            FieldValue::Unset => true,
            FieldValue::Str(text) => text.is_empty() && self.valid_options.is_some(),
            _ => false,
        };
        let default_value = self.default_value.unwrap_or_else(|| self.value.clone());
        let descriptor = FieldDescriptor {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            kind: self.kind,
            optional,
            value: self.value,
            default_value,
            bounds: self.bounds,
            valid_options: self.valid_options,
            math_condition,
            automl_eligible: self.automl_eligible,
            popular: self.popular,
            description: self.description,
        };

        for (slot, value) in [
            ("value", descriptor.value()),
            ("default_value", descriptor.default_value()),
        ] {
            descriptor.check(value).map_err(|violation| {
                SchemaDefinitionError::InvalidDeclaredValue {
                    field: field.clone(),
                    slot,
                    violation,
                }
            })?;
        }

        Ok(descriptor)
    }
}

impl FieldBuilder<bool> {
    /// Override the default value.
    pub fn default_value(mut self, value: bool) -> Self {
        self.default_value = Some(FieldValue::Bool(value));
        self
    }
}

impl FieldBuilder<i64> {
    /// Override the default value.
    pub fn default_value(mut self, value: i64) -> Self {
        self.default_value = Some(FieldValue::Int(value));
        self
    }
}

impl FieldBuilder<f64> {
    /// Override the default value.
    pub fn default_value(mut self, value: f64) -> Self {
        self.default_value = Some(FieldValue::Float(value));
        self
    }
}

impl FieldBuilder<String> {
    /// Override the default value.
    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(FieldValue::Str(value.to_owned()));
        self
    }

    /// Restrict the field to a fixed set of values.
    pub fn valid_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.valid_options = Some(
            options
                .into_iter()
                .map(|option| option.as_ref().into())
                .collect(),
        );
        self
    }
}

impl FieldBuilder<Vec<i64>> {
    /// Override the default value.
    pub fn default_value(mut self, value: impl IntoIterator<Item = i64>) -> Self {
        self.default_value = Some(FieldValue::IntList(value.into_iter().collect()));
        self
    }
}

impl FieldBuilder<Vec<String>> {
    /// Override the default value.
    pub fn default_value<'a>(mut self, value: impl IntoIterator<Item = &'a str>) -> Self {
        self.default_value = Some(FieldValue::StrList(
            value.into_iter().map(str::to_owned).collect(),
        ));
        self
    }
}

/// Native numeric types accepted by range methods.
pub trait Numeric: Copy + sealed::Sealed {
    /// Wrap a range in [`NumericBounds`].
    fn bounds(min: Self, max: Limit<Self>) -> NumericBounds;
}

impl Numeric for i64 {
    fn bounds(min: Self, max: Limit<Self>) -> NumericBounds {
        NumericBounds::Int(Bounds { min, max })
    }
}

impl Numeric for f64 {
    fn bounds(min: Self, max: Limit<Self>) -> NumericBounds {
        NumericBounds::Float(Bounds { min, max })
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
}

impl<T: Numeric> FieldBuilder<T> {
    /// Lower bound with an unbounded maximum (`valid_max = "inf"`).
    pub fn min(mut self, min: T) -> Self {
        self.bounds = Some(T::bounds(min, Limit::Unbounded));
        self
    }

    /// Inclusive range.
    pub fn range(mut self, min: T, max: T) -> Self {
        self.bounds = Some(T::bounds(min, Limit::Finite(max)));
        self
    }

    /// Extra predicate such as `"> 0.0"` or `"!= 0"`.
    pub fn math_condition(mut self, condition: &str) -> Self {
        self.math_condition = Some(condition.into());
        self
    }
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
