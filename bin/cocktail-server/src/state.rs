//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use cocktail_mixer::{CommandMixer, MixAdmission, MixService, Mixer};
use tracing::info;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Runs mixes under admission control.
    pub mixing: Arc<MixService>,
}

impl AppState {
    /// Wire the configured mixer program into a [`MixService`].
    pub fn from_config(config: Config) -> Self {
        let mixer = match config.mixer_command.as_deref().map(str::split_whitespace) {
            Some(mut parts) => match parts.next() {
                Some(program) => CommandMixer::new(program, parts),
                None => CommandMixer::lm_cocktail(config.python.clone()),
            },
            None => CommandMixer::lm_cocktail(config.python.clone()),
        };
        info!(
            program = mixer.program(),
            max_concurrent_mixes = config.max_concurrent_mixes,
            timeout = ?config.mix_timeout,
            "mixer configured"
        );
        Self::with_mixer(config, Arc::new(mixer))
    }

    /// Build state around an arbitrary [`Mixer`].
    pub fn with_mixer(config: Config, mixer: Arc<dyn Mixer>) -> Self {
        let mixing = MixService::new(mixer, MixAdmission::new(config.max_concurrent_mixes))
            .with_timeout(config.mix_timeout);
        Self {
            config: Arc::new(config),
            mixing: Arc::new(mixing),
        }
    }
}
