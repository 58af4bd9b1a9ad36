//! Configuration schema: an ordered, frozen set of field descriptors plus
//! cross-field rules.

use crate::field::{FieldDescriptor, FieldKind, RuleViolation};
use gdino_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Rule spanning more than one field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CrossFieldRule {
    /// `len(list) == count`.
    LengthMatches {
        /// List field.
        list: Box<str>,
        /// Integer field holding the expected length.
        count: Box<str>,
    },
}

impl CrossFieldRule {
    /// Require the list field to have as many entries as the count field says.
    #[must_use]
    pub fn length_matches(list: &str, count: &str) -> Self {
        Self::LengthMatches {
            list: list.into(),
            count: count.into(),
        }
    }

    /// Stable rule identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LengthMatches { .. } => "length_matches",
        }
    }
}

impl fmt::Display for CrossFieldRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMatches { list, count } => write!(formatter, "len({list}) == {count}"),
        }
    }
}

/// Frozen schema shared by every record built from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSchema {
    name: Box<str>,
    fields: Vec<FieldDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cross_field_rules: Vec<CrossFieldRule>,
    #[serde(skip)]
    index: BTreeMap<Box<str>, usize>,
}

impl ConfigSchema {
    /// Start a schema for the section `name` (for example `model`).
    pub fn builder(name: &str) -> ConfigSchemaBuilder {
        ConfigSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            cross_field_rules: Vec::new(),
        }
    }

    /// Section name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.position(name).and_then(|idx| self.fields.get(idx))
    }

    /// Schema position of a field.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Descriptors in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    /// Descriptors as a slice.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declared cross-field rules.
    #[must_use]
    pub fn cross_field_rules(&self) -> &[CrossFieldRule] {
        &self.cross_field_rules
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConfigSchema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [`ConfigSchema`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ConfigSchemaBuilder {
    name: Box<str>,
    fields: Vec<FieldDescriptor>,
    cross_field_rules: Vec<CrossFieldRule>,
}

impl ConfigSchemaBuilder {
    /// Append a descriptor.
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Declare a cross-field rule.
    pub fn cross_field(mut self, rule: CrossFieldRule) -> Self {
        self.cross_field_rules.push(rule);
        self
    }

    /// Freeze the schema.
    pub fn build(self) -> Result<ConfigSchema, SchemaDefinitionError> {
        let mut index = BTreeMap::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if index.insert(Box::from(field.name()), idx).is_some() {
                return Err(SchemaDefinitionError::DuplicateField {
                    field: field.name().to_owned(),
                });
            }
        }

        let lookup = |name: &str| index.get(name).and_then(|idx| self.fields.get(*idx));
        for rule in &self.cross_field_rules {
            match rule {
                CrossFieldRule::LengthMatches { list, count } => {
                    let list_ok = lookup(list.as_ref()).is_some_and(|field| field.kind().is_list());
                    if !list_ok {
                        return Err(SchemaDefinitionError::InvalidCrossFieldRule {
                            rule: rule.to_string(),
                            field: list.to_string(),
                            reason: "must name a list field",
                        });
                    }
                    let count_ok = lookup(count.as_ref())
                        .is_some_and(|field| field.kind() == FieldKind::Int);
                    if !count_ok {
                        return Err(SchemaDefinitionError::InvalidCrossFieldRule {
                            rule: rule.to_string(),
                            field: count.to_string(),
                            reason: "must name an int field",
                        });
                    }
                },
            }
        }

        Ok(ConfigSchema {
            name: self.name,
            fields: self.fields,
            cross_field_rules: self.cross_field_rules,
            index,
        })
    }
}

/// A descriptor or schema was declared incorrectly.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDefinitionError {
    /// Field name is empty or not an identifier.
    InvalidName {
        /// Offending name.
        field: String,
    },
    /// `min > max` or a NaN bound.
    InvalidBounds {
        /// Field name.
        field: String,
        /// Declared bounds.
        bounds: String,
    },
    /// `valid_options` declared without entries.
    EmptyOptions {
        /// Field name.
        field: String,
    },
    /// The same option listed twice.
    DuplicateOption {
        /// Field name.
        field: String,
        /// Repeated option.
        option: String,
    },
    /// Math condition does not parse.
    InvalidMathCondition {
        /// Field name.
        field: String,
        /// Raw condition.
        condition: String,
        /// Parse failure.
        reason: &'static str,
    },
    /// Declared value or default breaks the field's own rules.
    InvalidDeclaredValue {
        /// Field name.
        field: String,
        /// `value` or `default_value`.
        slot: &'static str,
        /// Broken rule.
        violation: RuleViolation,
    },
    /// AutoML eligibility on a field that cannot be searched.
    AutomlUnsupported {
        /// Field name.
        field: String,
        /// Why the field is not searchable.
        reason: &'static str,
    },
    /// Two descriptors share a name.
    DuplicateField {
        /// Repeated name.
        field: String,
    },
    /// Cross-field rule names an unknown or wrongly-typed field.
    InvalidCrossFieldRule {
        /// Rule as written.
        rule: String,
        /// Offending field.
        field: String,
        /// Expected shape.
        reason: &'static str,
    },
}

impl SchemaDefinitionError {
    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        let code = match self {
            Self::InvalidName { .. } => "invalid_field_name",
            Self::InvalidBounds { .. } => "invalid_bounds",
            Self::EmptyOptions { .. } => "empty_options",
            Self::DuplicateOption { .. } => "duplicate_option",
            Self::InvalidMathCondition { .. } => "invalid_math_condition",
            Self::InvalidDeclaredValue { .. } => "invalid_declared_value",
            Self::AutomlUnsupported { .. } => "automl_unsupported",
            Self::DuplicateField { .. } => "duplicate_field",
            Self::InvalidCrossFieldRule { .. } => "invalid_cross_field_rule",
        };
        ErrorCode::new("schema", code)
    }

    /// Field the error refers to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidName { field }
            | Self::InvalidBounds { field, .. }
            | Self::EmptyOptions { field }
            | Self::DuplicateOption { field, .. }
            | Self::InvalidMathCondition { field, .. }
            | Self::InvalidDeclaredValue { field, .. }
            | Self::AutomlUnsupported { field, .. }
            | Self::DuplicateField { field }
            | Self::InvalidCrossFieldRule { field, .. } => field,
        }
    }
}

impl fmt::Display for SchemaDefinitionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { field } => write!(formatter, "invalid field name: {field:?}"),
            Self::InvalidBounds { field, bounds } => {
                write!(formatter, "{field} declares unordered bounds {bounds}")
            },
            Self::EmptyOptions { field } => {
                write!(formatter, "{field} declares an empty valid_options set")
            },
            Self::DuplicateOption { field, option } => {
                write!(formatter, "{field} lists option {option:?} more than once")
            },
            Self::InvalidMathCondition {
                field,
                condition,
                reason,
            } => write!(
                formatter,
                "{field} has invalid math condition {condition:?}: {reason}"
            ),
            Self::InvalidDeclaredValue {
                field,
                slot,
                violation,
            } => write!(formatter, "{field}.{slot} {violation}"),
            Self::AutomlUnsupported { field, reason } => {
                write!(formatter, "{field} cannot be AutoML-eligible: {reason}")
            },
            Self::DuplicateField { field } => {
                write!(formatter, "field {field} is declared more than once")
            },
            Self::InvalidCrossFieldRule {
                rule,
                field,
                reason,
            } => write!(formatter, "rule `{rule}`: {field} {reason}"),
        }
    }
}

impl std::error::Error for SchemaDefinitionError {}

impl From<SchemaDefinitionError> for ErrorEnvelope {
    fn from(error: SchemaDefinitionError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::invariant(code, message).with_metadata("field", error.field());

        match error {
            SchemaDefinitionError::InvalidDeclaredValue {
                slot, violation, ..
            } => envelope
                .with_metadata("slot", slot)
                .with_metadata("rule", violation.rule()),
            SchemaDefinitionError::InvalidCrossFieldRule { rule, .. } => {
                envelope.with_metadata("rule", rule)
            },
            SchemaDefinitionError::InvalidMathCondition { condition, .. } => {
                envelope.with_metadata("condition", condition)
            },
            SchemaDefinitionError::DuplicateOption { option, .. } => {
                envelope.with_metadata("option", option)
            },
            SchemaDefinitionError::InvalidBounds { bounds, .. } => {
                envelope.with_metadata("bounds", bounds)
            },
            SchemaDefinitionError::InvalidName { .. }
            | SchemaDefinitionError::EmptyOptions { .. }
            | SchemaDefinitionError::AutomlUnsupported { .. }
            | SchemaDefinitionError::DuplicateField { .. } => envelope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{int_field, int_list_field, str_field};
    use gdino_shared::ErrorKind;
    use std::error::Error;

    fn levels_schema() -> Result<ConfigSchema, SchemaDefinitionError> {
        ConfigSchema::builder("model")
            .field(int_field("num_feature_levels", 4).range(1, 5).build()?)
            .field(int_list_field("return_interm_indices", [1, 2, 3, 4]).build()?)
            .cross_field(CrossFieldRule::length_matches(
                "return_interm_indices",
                "num_feature_levels",
            ))
            .build()
    }

    #[test]
    fn keeps_declaration_order_and_lookup() -> Result<(), Box<dyn Error>> {
        let schema = levels_schema()?;

        let names: Vec<&str> = schema.iter().map(FieldDescriptor::name).collect();
        assert_eq!(names, ["num_feature_levels", "return_interm_indices"]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.position("return_interm_indices"), Some(1));
        assert!(schema.get("missing").is_none());
        assert_eq!(schema.cross_field_rules().len(), 1);
        Ok(())
    }

    #[test]
    fn rejects_duplicate_fields() -> Result<(), Box<dyn Error>> {
        let error = ConfigSchema::builder("model")
            .field(int_field("nheads", 8).build()?)
            .field(int_field("nheads", 4).build()?)
            .build()
            .err();

        assert_eq!(
            error,
            Some(SchemaDefinitionError::DuplicateField {
                field: "nheads".to_owned()
            })
        );
        Ok(())
    }

    #[test]
    fn rejects_rules_on_unknown_or_mistyped_fields() -> Result<(), Box<dyn Error>> {
        let unknown = ConfigSchema::builder("model")
            .field(int_field("num_feature_levels", 4).build()?)
            .cross_field(CrossFieldRule::length_matches(
                "return_interm_indices",
                "num_feature_levels",
            ))
            .build()
            .err();
        assert!(matches!(
            unknown,
            Some(SchemaDefinitionError::InvalidCrossFieldRule { ref field, .. })
                if field == "return_interm_indices"
        ));

        let mistyped = ConfigSchema::builder("model")
            .field(str_field("num_feature_levels", "four").build()?)
            .field(int_list_field("return_interm_indices", [1]).build()?)
            .cross_field(CrossFieldRule::length_matches(
                "return_interm_indices",
                "num_feature_levels",
            ))
            .build()
            .err();
        assert!(matches!(
            mistyped,
            Some(SchemaDefinitionError::InvalidCrossFieldRule { ref field, .. })
                if field == "num_feature_levels"
        ));
        Ok(())
    }

    #[test]
    fn serializes_for_ui_generators() -> Result<(), Box<dyn Error>> {
        let encoded = serde_json::to_value(levels_schema()?)?;

        assert_eq!(encoded["name"], "model");
        assert_eq!(encoded["fields"][0]["name"], "num_feature_levels");
        assert_eq!(encoded["fields"][0]["bounds"]["max"], 5);
        assert_eq!(encoded["cross_field_rules"][0]["rule"], "length_matches");
        assert!(encoded.get("index").is_none());
        Ok(())
    }

    #[test]
    fn converts_to_invariant_envelope() -> Result<(), Box<dyn Error>> {
        let error = int_field("num_queries", 0).min(1).build().err();
        let envelope = ErrorEnvelope::from(error.ok_or("expected a definition error")?);

        assert_eq!(envelope.kind, ErrorKind::Invariant);
        assert_eq!(envelope.code, ErrorCode::new("schema", "invalid_declared_value"));
        assert_eq!(envelope.metadata.get("field").map(String::as_str), Some("num_queries"));
        assert_eq!(envelope.metadata.get("rule").map(String::as_str), Some("bounds"));
        Ok(())
    }
}
