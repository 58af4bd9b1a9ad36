//! # gdino-config
//!
//! Declarative hyperparameter schema for Grounding DINO: field descriptors,
//! frozen schemas, populated records, validation, AutoML search-space
//! extraction and spec-file loading. This crate depends on `shared` only.

/// AutoML search-space extraction.
pub mod automl;
/// Math conditions attached to numeric fields.
pub mod condition;
/// Environment variable overrides.
pub mod env;
/// Field descriptors and their builders.
pub mod field;
/// Spec-file loading helpers (file + dotted overrides + env).
pub mod load;
/// Grounding DINO model schema and typed config.
pub mod model;
/// Populated configuration records.
pub mod record;
/// Schema assembly and definition errors.
pub mod schema;
/// Record validation.
pub mod validate;

pub use automl::{DimensionKind, SearchDimension, SearchSpace, search_space};
pub use condition::{Comparison, ConditionParseError, MathCondition};
pub use env::{ENV_MODEL_PREFIX, EnvParseError, ModelEnv, apply_env_overrides, env_var_name};
pub use field::{
    Bounds, FieldBuilder, FieldDescriptor, FieldKind, FieldValue, Limit, NumericBounds,
    RuleViolation, bool_field, float_field, int_field, int_list_field, str_field, str_list_field,
};
pub use load::{
    DottedOverride, SpecFormat, detect_spec_format, load_model_config, load_model_config_std_env,
    load_model_record, load_model_record_from_path, load_model_record_std_env,
    parse_dotted_overrides, parse_spec_document, read_spec_document, to_pretty_json,
    to_pretty_yaml,
};
pub use model::{
    DecoderSaType, LogScale, MODEL_SECTION, ModelConfig, SUPPORTED_BACKBONES, TwoStageType,
    model_json_schema, model_schema, shared_model_schema,
};
pub use record::ConfigRecord;
pub use schema::{ConfigSchema, ConfigSchemaBuilder, CrossFieldRule, SchemaDefinitionError};
pub use validate::{ConfigValidationError, ValidatedRecord, collect_violations, validate_record};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
