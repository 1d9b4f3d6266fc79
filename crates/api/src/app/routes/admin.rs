use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::app::AppState;
use crate::context::CallerContext;

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "active_sessions": state.sessions.len(),
    }))
}

pub async fn purge_sessions(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> impl IntoResponse {
    let purged = state.sessions.purge();
    tracing::info!(
        "{} purged {} sessions",
        caller.principal().map(|p| p.as_str()).unwrap_or("<anonymous>"),
        purged
    );
    Json(serde_json::json!({
        "status": "ok",
        "purged": purged,
    }))
}
