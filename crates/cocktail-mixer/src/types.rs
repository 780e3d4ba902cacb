//! Mixing job types.
//!
//! Jobs are only constructible through their validating constructors, so a
//! [`Mixer`](crate::Mixer) never sees a job that breaks the invariants below.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MixError, Result};

/// Architecture class of the models being mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Generative (causal LM) models.
    #[serde(alias = "llm")]
    Decoder,
    /// Embedding models.
    #[serde(alias = "embedder")]
    Encoder,
}

impl ModelFamily {
    /// Name understood by the mixing library.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Decoder => "decoder",
            ModelFamily::Encoder => "encoder",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(input, output)` example for a generative mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(deny_unknown_fields)]
pub struct GenerativeExample {
    pub input: String,
    pub output: String,
}

/// One `(query, positives, negatives)` example for an embedder mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(deny_unknown_fields)]
pub struct EmbedderExample {
    pub query: String,
    pub pos: Vec<String>,
    pub neg: Vec<String>,
}

/// Optional knobs that only the embedder path of a data-driven mix accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedderTuning {
    pub max_input_length: Option<u32>,
    pub neg_number: Option<u32>,
}

/// Example data for a data-driven mix, tagged by model family.
#[derive(Debug, Clone, PartialEq)]
pub enum ExampleSet {
    Generative(Vec<GenerativeExample>),
    Embedder {
        examples: Vec<EmbedderExample>,
        tuning: EmbedderTuning,
    },
}

impl ExampleSet {
    pub fn family(&self) -> ModelFamily {
        match self {
            ExampleSet::Generative(_) => ModelFamily::Decoder,
            ExampleSet::Embedder { .. } => ModelFamily::Encoder,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExampleSet::Generative(items) => items.len(),
            ExampleSet::Embedder { examples, .. } => examples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tuning values to forward; always `None` for generative examples.
    pub fn tuning(&self) -> Option<EmbedderTuning> {
        match self {
            ExampleSet::Generative(_) => None,
            ExampleSet::Embedder { tuning, .. } => Some(*tuning),
        }
    }

    /// Flatten the examples into the plain key-value records the library
    /// expects (`input`/`output` or `query`/`pos`/`neg`).
    pub fn records(&self) -> Vec<Map<String, Value>> {
        match self {
            ExampleSet::Generative(items) => items
                .iter()
                .map(|item| {
                    let mut record = Map::new();
                    record.insert("input".into(), Value::from(item.input.as_str()));
                    record.insert("output".into(), Value::from(item.output.as_str()));
                    record
                })
                .collect(),
            ExampleSet::Embedder { examples, .. } => examples
                .iter()
                .map(|item| {
                    let mut record = Map::new();
                    record.insert("query".into(), Value::from(item.query.as_str()));
                    record.insert("pos".into(), Value::from(item.pos.clone()));
                    record.insert("neg".into(), Value::from(item.neg.clone()));
                    record
                })
                .collect(),
        }
    }
}

/// A uniform or by-layer mix: one weight per model.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMix {
    models: Vec<String>,
    family: ModelFamily,
    weights: Vec<f64>,
    output_path: PathBuf,
}

impl WeightedMix {
    pub fn new(
        models: Vec<String>,
        family: ModelFamily,
        weights: Vec<f64>,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let output_path = output_path.into();
        check_models(&models)?;
        check_output_path(&output_path)?;

        if weights.len() != models.len() {
            return Err(MixError::InvalidJob(format!(
                "got {} weight(s) for {} model(s); weights must match models one-to-one",
                weights.len(),
                models.len()
            )));
        }
        if let Some((i, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(MixError::InvalidJob(format!(
                "weight {i} is not a finite number ({w})"
            )));
        }

        Ok(Self {
            models,
            family,
            weights,
            output_path,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// A data-driven mix: weights are derived by the library from `examples`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMix {
    models: Vec<String>,
    temperature: f64,
    examples: ExampleSet,
    output_path: PathBuf,
}

impl DataMix {
    pub fn new(
        models: Vec<String>,
        temperature: f64,
        examples: ExampleSet,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let output_path = output_path.into();
        check_models(&models)?;
        check_output_path(&output_path)?;

        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(MixError::InvalidJob(format!(
                "temperature must be a positive number, got {temperature}"
            )));
        }
        if examples.is_empty() {
            return Err(MixError::InvalidJob(
                "example_data must contain at least one item".into(),
            ));
        }

        Ok(Self {
            models,
            temperature,
            examples,
            output_path,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn family(&self) -> ModelFamily {
        self.examples.family()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn examples(&self) -> &ExampleSet {
        &self.examples
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

fn check_models(models: &[String]) -> Result<()> {
    if models.is_empty() {
        return Err(MixError::InvalidJob("at least one model is required".into()));
    }
    if let Some(i) = models.iter().position(|m| m.trim().is_empty()) {
        return Err(MixError::InvalidJob(format!(
            "model identifier {i} must not be empty"
        )));
    }
    Ok(())
}

fn check_output_path(path: &Path) -> Result<()> {
    if path.to_string_lossy().trim().is_empty() {
        return Err(MixError::InvalidJob("output_path must not be blank".into()));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
