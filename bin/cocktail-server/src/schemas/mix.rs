//! Request / response types for the mixing endpoints.
//!
//! Field names follow the LM_Cocktail Python API so existing clients keep
//! working, including the `model_names_or_paths` alias for `models`.

use cocktail_mixer::{
    DataMix, EmbedderExample, EmbedderTuning, ExampleSet, GenerativeExample, MixError,
    ModelFamily, WeightedMix,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Request body for `POST /mix_models` and `POST /mix_models_by_layers`.
///
/// Per-layer mixing takes exactly the uniform fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct MixModelsRequest {
    /// Model paths or hub names, in the same order as `weights`.
    #[serde(alias = "model_names_or_paths")]
    #[validate(
        length(min = 1, message = "at least one model is required"),
        custom(function = "validate_model_ids")
    )]
    pub models: Vec<String>,
    /// Family of every model in `models`.
    pub model_type: ModelFamily,
    /// One mixing weight per model.
    #[validate(length(min = 1, message = "at least one weight is required"))]
    pub weights: Vec<f64>,
    /// Where the merged model is written.
    #[validate(custom(function = "validate_output_path"))]
    pub output_path: String,
}

impl MixModelsRequest {
    /// Build the mixing job; fails when weights and models do not pair up.
    pub fn to_job(&self) -> Result<WeightedMix, MixError> {
        WeightedMix::new(
            self.models.clone(),
            self.model_type,
            self.weights.clone(),
            &self.output_path,
        )
    }
}

/// Example data tagged by `model_type`.
///
/// The tag selects the item shape: items shaped for the other family are
/// rejected while the body is parsed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum FamilyExamples {
    /// Generative models; each item is an `(input, output)` pair.
    #[serde(alias = "llm")]
    Decoder {
        example_data: Vec<GenerativeExample>,
    },
    /// Embedding models; each item is a `(query, pos, neg)` triple.
    #[serde(alias = "embedder")]
    Encoder {
        example_data: Vec<EmbedderExample>,
        /// Maximum tokenized input length used while scoring examples.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_input_length: Option<u32>,
        /// Number of negatives sampled per example.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        neg_number: Option<u32>,
    },
}

impl From<FamilyExamples> for ExampleSet {
    fn from(examples: FamilyExamples) -> Self {
        match examples {
            FamilyExamples::Decoder { example_data } => ExampleSet::Generative(example_data),
            FamilyExamples::Encoder {
                example_data,
                max_input_length,
                neg_number,
            } => ExampleSet::Embedder {
                examples: example_data,
                tuning: EmbedderTuning {
                    max_input_length,
                    neg_number,
                },
            },
        }
    }
}

/// Request body for `POST /mix_models_with_data`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct MixModelsWithDataRequest {
    /// Model paths or hub names.
    #[serde(alias = "model_names_or_paths")]
    #[validate(
        length(min = 1, message = "at least one model is required"),
        custom(function = "validate_model_ids")
    )]
    pub models: Vec<String>,
    /// How strongly the example data shapes the computed weights.
    pub temperature: f64,
    /// Where the merged model is written.
    #[validate(custom(function = "validate_output_path"))]
    pub output_path: String,
    #[serde(flatten)]
    pub examples: FamilyExamples,
}

impl MixModelsWithDataRequest {
    pub fn into_job(self) -> Result<DataMix, MixError> {
        DataMix::new(
            self.models,
            self.temperature,
            self.examples.into(),
            self.output_path,
        )
    }
}

/// Response body for every successful mix.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MixResponse {
    pub message: String,
    /// The `output_path` from the request.
    pub output_path: String,
}

#[allow(clippy::ptr_arg)]
fn validate_model_ids(models: &Vec<String>) -> Result<(), ValidationError> {
    if models.iter().any(|m| m.trim().is_empty()) {
        return Err(ValidationError::new("blank_model")
            .with_message("model identifiers must not be blank".into()));
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn validate_output_path(path: &String) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::new("blank_output_path")
            .with_message("output_path must not be blank".into()));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
