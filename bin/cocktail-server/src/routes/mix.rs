//! Model-mixing routes.
//!
//! Each handler validates the body, builds a mixing job and hands it to the
//! [`MixService`](cocktail_mixer::MixService).  The response echoes the
//! requested `output_path` once the merged model has been written.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::{ErrorBody, ServerError};
use crate::extract::ValidatedJson;
use crate::schemas::mix::{FamilyExamples, MixModelsRequest, MixModelsWithDataRequest, MixResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(mix_models, mix_models_with_data, mix_models_by_layers),
    components(schemas(
        MixModelsRequest,
        MixModelsWithDataRequest,
        FamilyExamples,
        MixResponse,
        ErrorBody,
    ))
)]
pub struct MixApi;

/// Register mixing routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mix_models", post(mix_models))
        .route("/mix_models_with_data", post(mix_models_with_data))
        .route("/mix_models_by_layers", post(mix_models_by_layers))
}

/// Uniform weighted mix (`POST /mix_models`).
#[utoipa::path(
    post,
    path = "/mix_models",
    tag = "mix",
    request_body = MixModelsRequest,
    responses(
        (status = 200, description = "Merged model written", body = MixResponse),
        (status = 404, description = "A local model path does not exist", body = ErrorBody),
        (status = 409, description = "Output path is being written by another mix", body = ErrorBody),
        (status = 422, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Mixing failed", body = ErrorBody),
        (status = 503, description = "All mix slots are busy", body = ErrorBody),
        (status = 504, description = "Mix timed out", body = ErrorBody),
    )
)]
pub async fn mix_models(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<MixModelsRequest>,
) -> Result<Json<MixResponse>, ServerError> {
    let job = req.to_job()?;
    debug!(models = ?job.models(), weights = ?job.weights(), family = %job.family(), "uniform mix request");

    state.mixing.mix(&job).await?;

    info!(output_path = %req.output_path, "model mixed");
    Ok(Json(MixResponse {
        message: "Model mixed successfully.".into(),
        output_path: req.output_path,
    }))
}

/// Data-driven mix (`POST /mix_models_with_data`).
///
/// `model_type` selects the shape of `example_data`.  `max_input_length`
/// and `neg_number` are only used for `encoder` models.
#[utoipa::path(
    post,
    path = "/mix_models_with_data",
    tag = "mix",
    request_body = MixModelsWithDataRequest,
    responses(
        (status = 200, description = "Merged model written", body = MixResponse),
        (status = 404, description = "A local model path does not exist", body = ErrorBody),
        (status = 409, description = "Output path is being written by another mix", body = ErrorBody),
        (status = 422, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Mixing failed", body = ErrorBody),
        (status = 503, description = "All mix slots are busy", body = ErrorBody),
        (status = 504, description = "Mix timed out", body = ErrorBody),
    )
)]
pub async fn mix_models_with_data(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<MixModelsWithDataRequest>,
) -> Result<Json<MixResponse>, ServerError> {
    let output_path = req.output_path.clone();
    let job = req.into_job()?;
    debug!(
        models = ?job.models(),
        family = %job.family(),
        examples = job.examples().len(),
        temperature = job.temperature(),
        "data-driven mix request"
    );

    state.mixing.mix_with_data(&job).await?;

    info!(output_path = %output_path, "model mixed with data");
    Ok(Json(MixResponse {
        message: "Model mixed with data successfully.".into(),
        output_path,
    }))
}

/// Per-layer weighted mix (`POST /mix_models_by_layers`).
#[utoipa::path(
    post,
    path = "/mix_models_by_layers",
    tag = "mix",
    request_body = MixModelsRequest,
    responses(
        (status = 200, description = "Merged model written", body = MixResponse),
        (status = 404, description = "A local model path does not exist", body = ErrorBody),
        (status = 409, description = "Output path is being written by another mix", body = ErrorBody),
        (status = 422, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Mixing failed", body = ErrorBody),
        (status = 503, description = "All mix slots are busy", body = ErrorBody),
        (status = 504, description = "Mix timed out", body = ErrorBody),
    )
)]
pub async fn mix_models_by_layers(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<MixModelsRequest>,
) -> Result<Json<MixResponse>, ServerError> {
    let job = req.to_job()?;
    debug!(models = ?job.models(), weights = ?job.weights(), family = %job.family(), "by-layer mix request");

    state.mixing.mix_by_layers(&job).await?;

    info!(output_path = %req.output_path, "model mixed by layers");
    Ok(Json(MixResponse {
        message: "Model mixed by layers successfully.".into(),
        output_path: req.output_path,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
