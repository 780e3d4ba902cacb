//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns the server version, the configured mixer and how many mixes are
/// currently running.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let admission = state.mixing.admission();
    Json(json!({
        "status":    "ok",
        "version":   env!("CARGO_PKG_VERSION"),
        "mixer":     state.mixing.mixer_name(),
        "in_flight": admission.in_flight(),
        "capacity":  admission.capacity(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::from_config(Config::default()))
    }

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = get_health(State(state())).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mixer"], "command");
    }

    #[tokio::test]
    async fn health_response_reports_idle_admission() {
        let Json(body) = get_health(State(state())).await;
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
        assert_eq!(body["in_flight"], 0);
        assert_eq!(body["capacity"], 1);
    }
}
