//! AutoML search-space extraction from a schema.

use crate::condition::MathCondition;
use crate::field::{Bounds, FieldDescriptor, FieldKind, FieldValue, Limit, NumericBounds};
use crate::schema::ConfigSchema;
use serde::Serialize;

/// How a dimension is sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DimensionKind {
    /// Integer range; `None` when the field declares no bounds.
    IntRange {
        /// Declared bounds.
        bounds: Option<Bounds<i64>>,
    },
    /// Float range; `None` when the field declares no bounds.
    FloatRange {
        /// Declared bounds.
        bounds: Option<Bounds<f64>>,
    },
    /// One of a fixed set of strings.
    Choice {
        /// Allowed values in declaration order.
        options: Vec<Box<str>>,
    },
    /// Boolean toggle.
    Flag,
}

/// One searchable field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDimension {
    /// Field name.
    pub name: Box<str>,
    /// Sampling rule.
    #[serde(flatten)]
    pub kind: DimensionKind,
    /// Extra numeric predicate the sample must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub math_condition: Option<MathCondition>,
    /// Starting point for the search.
    pub default: FieldValue,
}

impl SearchDimension {
    fn from_field(field: &FieldDescriptor) -> Option<Self> {
        let kind = match field.kind() {
            FieldKind::Bool => DimensionKind::Flag,
            FieldKind::Int => DimensionKind::IntRange {
                bounds: match field.bounds() {
                    Some(NumericBounds::Int(bounds)) => Some(*bounds),
                    _ => None,
                },
            },
            FieldKind::Float => DimensionKind::FloatRange {
                bounds: match field.bounds() {
                    Some(NumericBounds::Float(bounds)) => Some(*bounds),
                    _ => None,
                },
            },
            FieldKind::String => DimensionKind::Choice {
                options: field.valid_options()?.to_vec(),
            },
            FieldKind::ListOfInt | FieldKind::ListOfString => return None,
        };

        Some(Self {
            name: field.name().into(),
            kind,
            math_condition: field.math_condition().copied(),
            default: field.default_value().clone(),
        })
    }

    /// Number of distinct points, or `None` for continuous or unbounded ranges.
    #[must_use]
    pub fn cardinality(&self) -> Option<usize> {
        match &self.kind {
            DimensionKind::IntRange {
                bounds:
                    Some(Bounds {
                        min,
                        max: Limit::Finite(max),
                    }),
            } => usize::try_from(max.checked_sub(*min)?.checked_add(1)?).ok(),
            DimensionKind::Choice { options } => Some(options.len()),
            DimensionKind::Flag => Some(2),
            DimensionKind::IntRange { .. } | DimensionKind::FloatRange { .. } => None,
        }
    }
}

/// Ordered list of AutoML dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSpace {
    /// Dimensions in schema order.
    pub dimensions: Vec<SearchDimension>,
}

impl SearchSpace {
    /// Dimension by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SearchDimension> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.name.as_ref() == name)
    }

    /// Field names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|dimension| dimension.name.as_ref())
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// True when no field is eligible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Total grid points, or `None` if any dimension has no natural grid.
    #[must_use]
    pub fn grid_size(&self) -> Option<usize> {
        self.dimensions
            .iter()
            .try_fold(1_usize, |total, dimension| {
                total.checked_mul(dimension.cardinality()?)
            })
    }
}

/// Collect every AutoML-eligible field of `schema` as a search dimension.
pub fn search_space(schema: &ConfigSchema) -> SearchSpace {
    SearchSpace {
        dimensions: schema
            .iter()
            .filter(|field| field.is_automl_eligible())
            .filter_map(SearchDimension::from_field)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{bool_field, float_field, int_field, str_field};
    use std::error::Error;

    fn schema() -> Result<ConfigSchema, Box<dyn Error>> {
        Ok(ConfigSchema::builder("model")
            .field(int_field("num_queries", 900).min(1).automl().build()?)
            .field(int_field("enc_layers", 6).range(1, 12).automl().build()?)
            .field(int_field("hidden_dim", 256).min(1).build()?)
            .field(float_field("focal_alpha", 0.25).math_condition("> 0.0").automl().build()?)
            .field(
                str_field("decoder_sa_type", "sa")
                    .valid_options(["sa", "ca_label", "ca_content"])
                    .automl()
                    .build()?,
            )
            .field(bool_field("aux_loss", true).automl().build()?)
            .build()?)
    }

    #[test]
    fn lists_only_eligible_fields_in_order() -> Result<(), Box<dyn Error>> {
        let space = search_space(&schema()?);

        let names: Vec<&str> = space.names().collect();
        assert_eq!(
            names,
            ["num_queries", "enc_layers", "focal_alpha", "decoder_sa_type", "aux_loss"]
        );
        assert!(space.get("hidden_dim").is_none());
        Ok(())
    }

    #[test]
    fn keeps_bounds_options_and_conditions() -> Result<(), Box<dyn Error>> {
        let space = search_space(&schema()?);

        assert_eq!(
            space.get("num_queries").map(|dimension| &dimension.kind),
            Some(&DimensionKind::IntRange {
                bounds: Some(Bounds {
                    min: 1,
                    max: Limit::Unbounded
                })
            })
        );
        assert_eq!(space.get("enc_layers").and_then(SearchDimension::cardinality), Some(12));
        assert!(space
            .get("focal_alpha")
            .and_then(|dimension| dimension.math_condition)
            .is_some());
        assert_eq!(
            space.get("decoder_sa_type").and_then(SearchDimension::cardinality),
            Some(3)
        );
        assert_eq!(space.grid_size(), None);
        Ok(())
    }

    #[test]
    fn serializes_unbounded_max_as_inf() -> Result<(), Box<dyn Error>> {
        let encoded = serde_json::to_value(search_space(&schema()?))?;
        let first = &encoded["dimensions"][0];

        assert_eq!(first["name"], "num_queries");
        assert_eq!(first["type"], "int_range");
        assert_eq!(first["bounds"]["max"], "inf");
        assert_eq!(first["default"], 900);
        Ok(())
    }

    #[test]
    fn grid_size_multiplies_discrete_dimensions() -> Result<(), Box<dyn Error>> {
        let schema = ConfigSchema::builder("model")
            .field(int_field("dec_layers", 6).range(1, 6).automl().build()?)
            .field(bool_field("use_dn", true).automl().build()?)
            .build()?;

        assert_eq!(search_space(&schema).grid_size(), Some(12));
        Ok(())
    }
}
