//! Grounding DINO model hyperparameters.
//!
//! [`model_schema`] declares every field with its default and validity
//! contract; [`ModelConfig`] is the typed value holder runners consume after
//! a record has been validated.

use crate::field::{bool_field, float_field, int_field, int_list_field, str_field, str_list_field};
use crate::record::ConfigRecord;
use crate::schema::{ConfigSchema, CrossFieldRule, SchemaDefinitionError};
use crate::validate::{ConfigValidationError, ValidatedRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Top-level spec-file key holding the model hyperparameters.
pub const MODEL_SECTION: &str = "model";

/// Backbones the runners know how to build.
pub const SUPPORTED_BACKBONES: &[&str] = &[
    "swin_tiny_224_1k",
    "swin_base_224_22k",
    "swin_base_384_22k",
    "swin_large_224_22k",
    "swin_large_384_22k",
    "resnet_50",
];

/// Declare the `model` section schema.
#[allow(
    clippy::too_many_lines,
    reason = "one declaration per hyperparameter keeps the schema readable in one place"
)]
pub fn model_schema() -> Result<ConfigSchema, SchemaDefinitionError> {
    ConfigSchema::builder(MODEL_SECTION)
        .field(
            str_field("pretrained_backbone_path", None)
                .default_value("")
                .display_name("pretrained backbone path")
                .description("Optional path to pretrained backbone weights.")
                .build()?,
        )
        .field(
            str_field("backbone", "swin_tiny_224_1k")
                .valid_options(SUPPORTED_BACKBONES)
                .display_name("backbone")
                .description("Backbone architecture: a Swin variant or ResNet-50.")
                .popular()
                .build()?,
        )
        .field(
            int_field("num_queries", 900)
                .min(1)
                .display_name("number of queries")
                .description("Number of object queries.")
                .automl()
                .popular()
                .build()?,
        )
        .field(
            int_field("num_feature_levels", 4)
                .range(1, 5)
                .display_name("number of feature levels")
                .description("Number of backbone feature levels fed to the transformer.")
                .build()?,
        )
        .field(
            float_field("set_cost_class", 1.0)
                .min(0.0)
                .display_name("set cost classification")
                .description("Weight of the classification error in the matching cost.")
                .popular()
                .build()?,
        )
        .field(
            float_field("set_cost_bbox", 5.0)
                .min(0.0)
                .display_name("set cost bbox")
                .description("Weight of the L1 box-coordinate error in the matching cost.")
                .popular()
                .build()?,
        )
        .field(
            float_field("set_cost_giou", 2.0)
                .min(0.0)
                .display_name("set cost GIoU")
                .description("Weight of the GIoU box loss in the matching cost.")
                .popular()
                .build()?,
        )
        .field(
            float_field("cls_loss_coef", 2.0)
                .min(0.0)
                .display_name("class loss coefficient")
                .description("Weight of the classification error in the final loss.")
                .popular()
                .build()?,
        )
        .field(
            float_field("bbox_loss_coef", 5.0)
                .min(0.0)
                .display_name("bbox loss coefficient")
                .description("Weight of the L1 box-coordinate error in the final loss.")
                .popular()
                .build()?,
        )
        .field(
            float_field("giou_loss_coef", 2.0)
                .min(0.0)
                .display_name("GIoU loss coefficient")
                .description("Weight of the GIoU box loss in the final loss.")
                .popular()
                .build()?,
        )
        .field(
            int_field("num_select", 300)
                .min(1)
                .display_name("num select")
                .description("Number of top-K predictions kept during post-processing.")
                .automl()
                .popular()
                .build()?,
        )
        .field(
            float_field("interm_loss_coef", 1.0)
                .display_name("intermediate loss coefficient")
                .build()?,
        )
        .field(
            bool_field("no_interm_box_loss", false)
                .display_name("no intermediate bbox loss")
                .description("Disable the intermediate box loss.")
                .build()?,
        )
        .field(
            bool_field("pre_norm", false)
                .display_name("pre norm")
                .description("Add layer norm in the encoder.")
                .build()?,
        )
        .field(
            str_field("two_stage_type", "standard")
                .valid_options(["standard", "no"])
                .display_name("two stage type")
                .description("Two-stage query selection mode.")
                .build()?,
        )
        .field(
            str_field("decoder_sa_type", "sa")
                .valid_options(["sa", "ca_label", "ca_content"])
                .display_name("decoder self-attention type")
                .description("Self-attention variant used in the decoder.")
                .build()?,
        )
        .field(
            bool_field("embed_init_tgt", true)
                .display_name("embed init target")
                .description("Learn an initial target embedding.")
                .build()?,
        )
        .field(
            int_field("fix_refpoints_hw", -1)
                .min(-2)
                .math_condition("!= 0")
                .display_name("fix refpoints hw")
                .description(
                    "-1 learns width and height per box, -2 learns a shared width and height, \
                     a positive value fixes them to that number.",
                )
                .build()?,
        )
        .field(
            int_field("pe_temperatureH", 20)
                .min(1)
                .display_name("pe_temperatureH")
                .description("Temperature of the sine positional embedding along height.")
                .build()?,
        )
        .field(
            int_field("pe_temperatureW", 20)
                .min(1)
                .display_name("pe_temperatureW")
                .description("Temperature of the sine positional embedding along width.")
                .build()?,
        )
        .field(
            int_list_field("return_interm_indices", [1, 2, 3, 4])
                .display_name("return interim indices")
                .description(
                    "Backbone feature levels to use; the length must equal num_feature_levels.",
                )
                .build()?,
        )
        .field(
            bool_field("use_dn", true)
                .display_name("use denoising")
                .description("Enable contrastive denoising training.")
                .build()?,
        )
        .field(
            int_field("dn_number", 0)
                .min(0)
                .display_name("denoising number")
                .description("Number of denoising queries.")
                .build()?,
        )
        .field(
            float_field("dn_box_noise_scale", 1.0)
                .min(0.0)
                .display_name("denoised boxes noise scaling")
                .description("Scale of box noise during contrastive denoising; 0 disables it.")
                .build()?,
        )
        .field(
            float_field("dn_label_noise_ratio", 0.5)
                .min(0.0)
                .display_name("denoise label noise ratio")
                .description("Ratio of label noise during contrastive denoising; 0 disables it.")
                .build()?,
        )
        .field(
            float_field("focal_alpha", 0.25)
                .math_condition("> 0.0")
                .display_name("focal alpha")
                .description("Alpha of the focal loss.")
                .build()?,
        )
        .field(
            float_field("focal_gamma", 2.0)
                .math_condition("> 0.0")
                .display_name("focal gamma")
                .description("Gamma of the focal loss.")
                .build()?,
        )
        .field(
            float_field("clip_max_norm", 0.1)
                .display_name("clip max norm")
                .build()?,
        )
        .field(
            int_field("nheads", 8)
                .display_name("nheads")
                .description("Number of attention heads.")
                .build()?,
        )
        .field(
            float_field("dropout_ratio", 0.0)
                .range(0.0, 1.0)
                .display_name("dropout ratio")
                .description("Probability of dropping hidden units.")
                .build()?,
        )
        .field(
            int_field("hidden_dim", 256)
                .display_name("hidden dim")
                .description("Width of the hidden units.")
                .build()?,
        )
        .field(
            int_field("enc_layers", 6)
                .min(1)
                .display_name("encoder layers")
                .description("Number of transformer encoder layers.")
                .automl()
                .build()?,
        )
        .field(
            int_field("dec_layers", 6)
                .min(1)
                .display_name("decoder layers")
                .description("Number of transformer decoder layers.")
                .automl()
                .build()?,
        )
        .field(
            int_field("dim_feedforward", 2048)
                .min(1)
                .display_name("dim feedforward")
                .description("Width of the feedforward network.")
                .build()?,
        )
        .field(
            int_field("dec_n_points", 4)
                .min(1)
                .display_name("decoder n points")
                .description("Number of reference points in the decoder.")
                .build()?,
        )
        .field(
            int_field("enc_n_points", 4)
                .min(1)
                .display_name("encoder n points")
                .description("Number of reference points in the encoder.")
                .build()?,
        )
        .field(
            bool_field("aux_loss", true)
                .display_name("auxiliary loss")
                .description("Apply the decoding loss at every decoder layer.")
                .build()?,
        )
        .field(
            bool_field("dilation", false)
                .display_name("dilation")
                .description("Enable dilation in the backbone.")
                .build()?,
        )
        .field(
            bool_field("train_backbone", true)
                .display_name("train backbone")
                .description("Keep backbone weights trainable; false freezes them.")
                .build()?,
        )
        .field(
            str_field("text_encoder_type", "bert-base-uncased")
                .display_name("text encoder type")
                .description(
                    "BERT encoder: a Hugging Face Hub model name or a local weights path.",
                )
                .build()?,
        )
        .field(
            int_field("max_text_len", 256)
                .min(1)
                .display_name("maximum text length")
                .description("Maximum caption length in tokens.")
                .build()?,
        )
        .field(
            bool_field("class_embed_bias", false)
                .display_name("class embedding bias")
                .description("Add a bias to the contrastive embedding.")
                .build()?,
        )
        .field(
            str_field("log_scale", None)
                .default_value("none")
                .display_name("log scale")
                .description(
                    "Similarity-matrix scaling: a number sets the initial value of a learnable \
                     scale, 'auto' divides by sqrt of the channel count, 'none' disables it.",
                )
                .build()?,
        )
        .field(
            str_list_field("loss_types", ["labels", "boxes"])
                .display_name("loss types")
                .description("Losses applied during training.")
                .build()?,
        )
        .field(
            str_list_field("backbone_names", ["backbone.0", "bert"])
                .display_name("backbone tensor name prefix")
                .description("Tensor name prefixes that belong to the backbone.")
                .build()?,
        )
        .field(
            str_list_field("linear_proj_names", ["reference_points", "sampling_offsets"])
                .display_name("linear projection names")
                .description("Names of the linear projection layers.")
                .build()?,
        )
        .cross_field(CrossFieldRule::length_matches(
            "return_interm_indices",
            "num_feature_levels",
        ))
        .build()
}

/// Build the model schema behind a shared handle.
pub fn shared_model_schema() -> Result<Arc<ConfigSchema>, SchemaDefinitionError> {
    model_schema().map(Arc::new)
}

/// Two-stage query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TwoStageType {
    /// Encoder proposals seed the decoder queries.
    Standard,
    /// Single stage.
    No,
}

/// Decoder self-attention variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecoderSaType {
    /// Plain self-attention.
    Sa,
    /// Cross-attention over label embeddings.
    CaLabel,
    /// Cross-attention over content embeddings.
    CaContent,
}

/// Similarity-matrix scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "Option<String>")]
pub enum LogScale {
    /// No scaling (`"none"` or unset).
    Disabled,
    /// Fixed `sqrt(d_c)` normalization (`"auto"`).
    Auto,
    /// Learnable scale with this initial value.
    Initial(f64),
}

impl TryFrom<Option<String>> for LogScale {
    type Error = String;

    fn try_from(raw: Option<String>) -> Result<Self, Self::Error> {
        let Some(raw) = raw else {
            return Ok(Self::Disabled);
        };
        match raw.trim() {
            "" | "none" | "None" => Ok(Self::Disabled),
            "auto" => Ok(Self::Auto),
            other => match other.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Self::Initial(value)),
                _ => Err(format!(
                    "log_scale must be 'none', 'auto' or a number (got {other:?})"
                )),
            },
        }
    }
}

impl From<LogScale> for Option<String> {
    fn from(scale: LogScale) -> Self {
        Some(scale.to_string())
    }
}

impl fmt::Display for LogScale {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => formatter.write_str("none"),
            Self::Auto => formatter.write_str("auto"),
            Self::Initial(value) => write!(formatter, "{value}"),
        }
    }
}

/// Typed model hyperparameters, produced from a validated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "mirrors the boolean switches of the model section"
)]
pub struct ModelConfig {
    /// Pretrained backbone weights; `None` trains from scratch.
    ///
    /// Left out when rendering so the record keeps the declared `""` default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretrained_backbone_path: Option<String>,
    /// Backbone architecture.
    pub backbone: String,
    /// Number of object queries.
    pub num_queries: i64,
    /// Number of feature levels.
    pub num_feature_levels: i64,
    /// Matching cost weight of the classification error.
    pub set_cost_class: f64,
    /// Matching cost weight of the L1 box error.
    pub set_cost_bbox: f64,
    /// Matching cost weight of the GIoU error.
    pub set_cost_giou: f64,
    /// Loss weight of the classification error.
    pub cls_loss_coef: f64,
    /// Loss weight of the L1 box error.
    pub bbox_loss_coef: f64,
    /// Loss weight of the GIoU error.
    pub giou_loss_coef: f64,
    /// Top-K predictions kept in post-processing.
    pub num_select: i64,
    /// Intermediate loss weight.
    pub interm_loss_coef: f64,
    /// Disable the intermediate box loss.
    pub no_interm_box_loss: bool,
    /// Layer norm in the encoder.
    pub pre_norm: bool,
    /// Two-stage mode.
    pub two_stage_type: TwoStageType,
    /// Decoder self-attention variant.
    pub decoder_sa_type: DecoderSaType,
    /// Learn an initial target embedding.
    pub embed_init_tgt: bool,
    /// Reference point width/height mode.
    pub fix_refpoints_hw: i64,
    /// Positional embedding temperature along height.
    #[serde(rename = "pe_temperatureH")]
    pub pe_temperature_h: i64,
    /// Positional embedding temperature along width.
    #[serde(rename = "pe_temperatureW")]
    pub pe_temperature_w: i64,
    /// Backbone feature levels to use.
    pub return_interm_indices: Vec<i64>,
    /// Contrastive denoising training.
    pub use_dn: bool,
    /// Denoising query count.
    pub dn_number: i64,
    /// Box noise scale for denoising.
    pub dn_box_noise_scale: f64,
    /// Label noise ratio for denoising.
    pub dn_label_noise_ratio: f64,
    /// Focal loss alpha.
    pub focal_alpha: f64,
    /// Focal loss gamma.
    pub focal_gamma: f64,
    /// Gradient clipping norm.
    pub clip_max_norm: f64,
    /// Attention heads.
    pub nheads: i64,
    /// Dropout probability.
    pub dropout_ratio: f64,
    /// Hidden width.
    pub hidden_dim: i64,
    /// Encoder layers.
    pub enc_layers: i64,
    /// Decoder layers.
    pub dec_layers: i64,
    /// Feedforward width.
    pub dim_feedforward: i64,
    /// Decoder reference points.
    pub dec_n_points: i64,
    /// Encoder reference points.
    pub enc_n_points: i64,
    /// Per-layer decoding loss.
    pub aux_loss: bool,
    /// Backbone dilation.
    pub dilation: bool,
    /// Trainable backbone.
    pub train_backbone: bool,
    /// Text encoder name or path.
    pub text_encoder_type: String,
    /// Maximum caption length.
    pub max_text_len: i64,
    /// Bias in the contrastive embedding.
    pub class_embed_bias: bool,
    /// Similarity-matrix scaling.
    #[schemars(with = "Option<String>")]
    pub log_scale: LogScale,
    /// Training losses.
    pub loss_types: Vec<String>,
    /// Backbone tensor name prefixes.
    pub backbone_names: Vec<String>,
    /// Linear projection layer names.
    pub linear_proj_names: Vec<String>,
}

impl ModelConfig {
    /// Convert a validated record into typed hyperparameters.
    pub fn from_validated(record: &ValidatedRecord) -> Result<Self, ConfigValidationError> {
        let mut config: Self = record.deserialize()?;
        config.pretrained_backbone_path = normalize_optional(config.pretrained_backbone_path);
        Ok(config)
    }

    /// Render back into a record of `schema`.
    pub fn to_record(&self, schema: Arc<ConfigSchema>) -> Result<ConfigRecord, ConfigValidationError> {
        let document = serde_json::to_value(self).map_err(|error| {
            ConfigValidationError::InvalidDocument {
                section: schema.name().to_owned(),
                reason: error.to_string(),
            }
        })?;
        ConfigRecord::from_json(schema, &document)
    }
}

/// JSON Schema of [`ModelConfig`].
pub fn model_json_schema() -> schemars::Schema {
    schemars::schema_for!(ModelConfig)
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}
