use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies up to this size are logged when they are JSON.
const MAX_LOGGED_BODY: usize = 1024;

/// Request bodies above this size are refused; same as axum's default
/// `Json` limit.
const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Wrap each request in a span carrying a trace ID.
///
/// A valid UUID in the incoming `x-trace-id` header is reused, otherwise a
/// new one is generated; either way it is echoed on the response.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let req_bytes =
            match buffer_and_log("request", &parts.headers, body, MAX_REQUEST_BODY).await {
                Ok(bytes) => bytes,
                Err(e) => return with_trace_id(e.into_response(), header_value),
            };
        let mut req = Request::from_parts(parts, Body::from(req_bytes));
        if let Some(value) = header_value.clone() {
            req.headers_mut().insert(X_TRACE_ID, value);
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let response = match buffer_and_log("response", &parts.headers, body, usize::MAX).await {
            Ok(bytes) => Response::from_parts(parts, Body::from(bytes)),
            Err(e) => e.into_response(),
        };
        let response = with_trace_id(response, header_value);

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

fn with_trace_id(mut response: Response, value: Option<HeaderValue>) -> Response {
    if let Some(value) = value {
        response.headers_mut().insert(X_TRACE_ID, value);
    }
    response
}

/// Collect at most `limit` bytes of a body, logging it when it is small JSON.
///
/// An oversized request body is refused with 413; any other read failure
/// with 400 (request) or 500 (response).
async fn buffer_and_log(
    direction: &str,
    headers: &header::HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Bytes, ServerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let status = if e.is::<LengthLimitError>() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else if direction == "request" {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return Err(ServerError::Rejected {
                status,
                message: format!("failed to read {direction} body: {e}"),
            });
        }
    };

    if is_json && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            info!("{} body: {}", direction, text);
        }
    } else if !bytes.is_empty() {
        info!(
            "{} body: [skipped: type={}, size={}]",
            direction,
            content_type,
            bytes.len()
        );
    }

    Ok(bytes)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
