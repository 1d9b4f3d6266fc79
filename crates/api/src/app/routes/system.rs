use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "connected": caller.principal().is_some(),
        "principal": caller.principal().map(|p| p.as_str()),
        "operation": caller.operation().to_string(),
    }))
}
