use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use gatekeep_auth::AuthError;
use gatekeep_core::Reply;

/// Map a gate reply onto an HTTP response.
pub fn reply_to_response(reply: Reply) -> axum::response::Response {
    let status = StatusCode::from_u16(reply.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, axum::Json(reply.body)).into_response();
    if let Some(location) = reply.location {
        match HeaderValue::from_str(&location) {
            Ok(value) => {
                response.headers_mut().insert(header::LOCATION, value);
            }
            Err(e) => tracing::warn!("dropping invalid redirect location: {e}"),
        }
    }
    response
}

/// Failures the gate did not translate: always a 500 with a JSON body.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    tracing::error!("request failed: {err:#}");
    match err {
        AuthError::Hook(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "hook_error", "internal error"),
        AuthError::Operation(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "operation_error", "internal error")
        }
        AuthError::Config(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "config_error", e.to_string()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
