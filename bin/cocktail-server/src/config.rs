//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for cocktail-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, logs go to a daily-rolling file in this directory instead
    /// of stdout.
    pub log_dir: Option<PathBuf>,

    /// Python interpreter used to run the bundled LM_Cocktail driver.
    pub python: String,

    /// Replaces the bundled driver: program followed by its arguments,
    /// whitespace-separated.
    pub mixer_command: Option<String>,

    /// Maximum number of mixes running at once.
    pub max_concurrent_mixes: usize,

    /// Per-mix deadline; `None` lets a mix run to completion.
    pub mix_timeout: Option<Duration>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// Comma-separated list of allowed CORS origins; wildcard when unset.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bind_address: get("COCKTAIL_BIND").unwrap_or_else(|| "0.0.0.0:8000".to_owned()),
            log_level: get("COCKTAIL_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: get("COCKTAIL_LOG_JSON").is_some_and(|v| parse_flag(&v)),
            log_dir: get("COCKTAIL_LOG_DIR").map(PathBuf::from),
            python: get("COCKTAIL_PYTHON").unwrap_or_else(|| "python3".to_owned()),
            mixer_command: get("COCKTAIL_MIXER_COMMAND"),
            max_concurrent_mixes: get("COCKTAIL_MAX_CONCURRENT_MIXES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            mix_timeout: get("COCKTAIL_MIX_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            enable_swagger: get("COCKTAIL_ENABLE_SWAGGER").is_none_or(|v| parse_flag(&v)),
            cors_allowed_origins: get("COCKTAIL_CORS_ORIGINS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
