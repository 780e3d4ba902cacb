//! cocktail-mixer – the model-mixing side of the LM-Cocktail service.
//!
//! The mixing mathematics lives in an external library.  This crate owns the
//! contract with it:
//!
//! - [`WeightedMix`] / [`DataMix`]: validated mixing jobs,
//! - [`Mixer`]: the black-box collaborator (uniform, by-layer, data-driven),
//! - [`CommandMixer`]: a [`Mixer`] that drives the library in a child process,
//! - [`MixService`]: runs jobs under [`MixAdmission`] and an optional deadline.

mod admission;
mod command;
mod error;
mod mixer;
mod service;
mod types;

pub use admission::{MixAdmission, MixPermit};
pub use command::{CommandMixer, MixInvocation, LM_COCKTAIL_DRIVER};
pub use error::{MixError, Result};
pub use mixer::{MixKind, Mixer};
pub use service::MixService;
pub use types::{
    DataMix, EmbedderExample, EmbedderTuning, ExampleSet, GenerativeExample, ModelFamily,
    WeightedMix,
};
