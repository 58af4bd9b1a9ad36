//! Configuration records: one effective value per schema field.

use crate::field::{FieldDescriptor, FieldValue};
use crate::schema::ConfigSchema;
use crate::validate::ConfigValidationError;
use std::sync::Arc;

/// A populated configuration: a shared schema plus one value per field in
/// schema order.
///
/// Records are immutable once assembled; `with_value` and friends consume the
/// record and return a new one.
#[derive(Debug, Clone)]
pub struct ConfigRecord {
    schema: Arc<ConfigSchema>,
    values: Vec<FieldValue>,
}

impl PartialEq for ConfigRecord {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.schema, &other.schema) || self.schema == other.schema)
            && self.values == other.values
    }
}

impl ConfigRecord {
    /// Record holding every field's default value.
    #[must_use]
    pub fn from_defaults(schema: Arc<ConfigSchema>) -> Self {
        let values = schema
            .iter()
            .map(|field| field.default_value().clone())
            .collect();
        Self { schema, values }
    }

    /// Defaults overlaid with the entries of a JSON object.
    pub fn from_json(
        schema: Arc<ConfigSchema>,
        document: &serde_json::Value,
    ) -> Result<Self, ConfigValidationError> {
        Self::from_defaults(schema).merge_json(document)
    }

    /// Overlay the entries of a JSON object. Unknown keys are rejected;
    /// absent keys keep their current value.
    pub fn merge_json(mut self, document: &serde_json::Value) -> Result<Self, ConfigValidationError> {
        let serde_json::Value::Object(entries) = document else {
            return Err(ConfigValidationError::InvalidDocument {
                section: self.schema.name().to_owned(),
                reason: "expected a mapping of field names to values".to_owned(),
            });
        };

        let schema = Arc::clone(&self.schema);
        for (name, raw) in entries {
            let (idx, field) = lookup(&schema, name)?;
            let value = FieldValue::from_json(field.kind(), raw).map_err(|mismatch| {
                ConfigValidationError::TypeMismatch {
                    field: name.clone(),
                    expected: mismatch.expected,
                    found: mismatch.found.to_owned(),
                }
            })?;
            self.set(idx, value);
        }
        Ok(self)
    }

    /// Replace one value. The value must be the unset sentinel or match the
    /// field kind; range and option rules are left to the validator.
    pub fn with_value(mut self, name: &str, value: FieldValue) -> Result<Self, ConfigValidationError> {
        let (idx, field) = lookup(&self.schema, name)?;
        if !value.is_unset() && value.kind() != Some(field.kind()) {
            return Err(ConfigValidationError::TypeMismatch {
                field: name.to_owned(),
                expected: field.kind(),
                found: value.type_name().to_owned(),
            });
        }
        self.set(idx, value);
        Ok(self)
    }

    /// Parse `raw` with the field's kind and replace the value.
    pub fn with_literal(self, name: &str, raw: &str) -> Result<Self, ConfigValidationError> {
        let field = self
            .schema
            .get(name)
            .ok_or_else(|| ConfigValidationError::UnknownField {
                section: self.schema.name().to_owned(),
                field: name.to_owned(),
            })?;
        let value = FieldValue::parse_literal(field.kind(), raw).map_err(|error| {
            ConfigValidationError::InvalidValue {
                field: name.to_owned(),
                value: error.input,
                reason: format!("expected a {} literal", error.expected),
            }
        })?;
        self.with_value(name, value)
    }

    /// Apply several replacements in order.
    pub fn apply_overrides<'a, I>(self, overrides: I) -> Result<Self, ConfigValidationError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        overrides
            .into_iter()
            .try_fold(self, |record, (name, value)| record.with_value(name, value))
    }

    /// Schema this record was built from.
    #[must_use]
    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Shared handle to the schema.
    #[must_use]
    pub const fn shared_schema(&self) -> &Arc<ConfigSchema> {
        &self.schema
    }

    /// Effective value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .position(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Descriptors paired with their effective values, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.schema.iter().zip(self.values.iter())
    }

    /// JSON object keyed by field name.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let entries = self
            .iter()
            .map(|(field, value)| (field.name().to_owned(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(entries)
    }

    fn set(&mut self, idx: usize, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = value;
        }
    }
}

fn lookup<'a>(
    schema: &'a ConfigSchema,
    name: &str,
) -> Result<(usize, &'a FieldDescriptor), ConfigValidationError> {
    schema
        .position(name)
        .and_then(|idx| schema.fields().get(idx).map(|field| (idx, field)))
        .ok_or_else(|| ConfigValidationError::UnknownField {
            section: schema.name().to_owned(),
            field: name.to_owned(),
        })
}
