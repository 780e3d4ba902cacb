use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DataMix, WeightedMix};

/// The three mixing operations exposed by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixKind {
    Uniform,
    ByLayers,
    WithData,
}

impl MixKind {
    /// Operation name in the job document and in logs.
    pub fn operation(self) -> &'static str {
        match self {
            MixKind::Uniform => "mix_models",
            MixKind::ByLayers => "mix_models_by_layers",
            MixKind::WithData => "mix_models_with_data",
        }
    }
}

impl fmt::Display for MixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// The external model-mixing library.
///
/// Every call is expected to run to completion and persist the merged model
/// at the job's `output_path` before returning `Ok`.  Implementations must
/// stop their work when the returned future is dropped.
#[async_trait]
pub trait Mixer: Send + Sync {
    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &str;

    /// Weighted average of all parameters.
    async fn mix(&self, job: &WeightedMix) -> Result<()>;

    /// Weighted average applied layer by layer.
    async fn mix_by_layers(&self, job: &WeightedMix) -> Result<()>;

    /// Weights derived from example data and `temperature`.
    async fn mix_with_data(&self, job: &DataMix) -> Result<()>;
}
