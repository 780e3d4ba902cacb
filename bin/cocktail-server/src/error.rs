//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a `{"detail": "..."}` JSON body with a status code per error kind.
//!
//! Failures reported by the mixing library are returned with their text
//! unchanged; callers need it to tell a bad checkpoint from a full disk.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cocktail_mixer::MixError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error text.
    pub detail: String,
}

/// All errors that can occur in the cocktail-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the mixing service.
    #[error(transparent)]
    Mix(#[from] MixError),

    /// The body could not be read, or not as JSON of the expected shape.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The body parsed but failed field validation.
    #[error("{0}")]
    InvalidRequest(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Rejected { status, .. } => *status,
            ServerError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Mix(e) => match e {
                MixError::InvalidJob(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MixError::ModelNotFound(_) => StatusCode::NOT_FOUND,
                MixError::OutputInUse(_) => StatusCode::CONFLICT,
                MixError::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
                MixError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                MixError::Backend(_)
                | MixError::Launch { .. }
                | MixError::Io(_)
                | MixError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        ServerError::InvalidRequest(describe(&errors))
    }
}

/// One `field: message` clause per failed rule, sorted by field name.
fn describe(errors: &ValidationErrors) -> String {
    let mut clauses: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    clauses.sort();
    clauses.join("; ")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn mix_errors_map_to_distinct_statuses() {
        let cases = [
            (MixError::InvalidJob("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (MixError::ModelNotFound("/m".into()), StatusCode::NOT_FOUND),
            (MixError::OutputInUse(PathBuf::from("/o")), StatusCode::CONFLICT),
            (MixError::Busy { capacity: 1 }, StatusCode::SERVICE_UNAVAILABLE),
            (MixError::Timeout(Duration::from_secs(5)), StatusCode::GATEWAY_TIMEOUT),
            (MixError::Backend("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ServerError::from(err).status(), expected);
        }
    }

    #[test]
    fn backend_message_is_not_rewritten() {
        let err = ServerError::from(MixError::Backend("CUDA out of memory".into()));
        assert_eq!(err.to_string(), "CUDA out of memory");
    }

    #[test]
    fn validation_errors_are_described_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "output_path",
            validator::ValidationError::new("length").with_message("must not be empty".into()),
        );
        errors.add("models", validator::ValidationError::new("length"));
        let err = ServerError::from(errors);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_string(),
            "models: length; output_path: must not be empty"
        );
    }
}
