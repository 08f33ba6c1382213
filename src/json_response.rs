//! JSON responses for `axum` handlers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Serializes `payload` into a response with `Content-Type: application/json`.
///
/// If serialization fails the caller gets a 500 with an `{"error": ...}` body
/// instead of the intended status.
pub fn respond_with_json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Response {
    match serde_json::to_vec(payload) {
        Ok(body) => json_bytes(status, body),
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, "failed to serialize JSON response");
            let body = serde_json::json!({ "error": format!("failed to serialize response: {err}") });
            json_bytes(StatusCode::INTERNAL_SERVER_ERROR, body.to_string().into_bytes())
        }
    }
}

/// Responds with `{"error": message}`.
pub fn respond_with_error(status: StatusCode, message: &str) -> Response {
    respond_with_json(status, &serde_json::json!({ "error": message }))
}

fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}
