use axum::{
    Router,
    routing::{delete, get, post},
};

use gatekeep_auth::OperationId;

use crate::app::{AppState, guarded};

pub mod admin;
pub mod auth;
pub mod system;

/// Router for every endpoint; each route is its own gated operation.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/health",
            guarded(state, OperationId::new("system", "health"), get(system::health)),
        )
        .route(
            "/authenticate",
            guarded(state, OperationId::new("auth", "authenticate"), post(auth::authenticate)),
        )
        .route(
            "/logout",
            guarded(state, OperationId::new("auth", "logout"), post(auth::logout)),
        )
        .route(
            "/whoami",
            guarded(state, OperationId::new("account", "whoami"), get(system::whoami)),
        )
        .route(
            "/admin/stats",
            guarded(state, OperationId::new("admin", "stats"), get(admin::stats)),
        )
        .route(
            "/admin/sessions",
            guarded(
                state,
                OperationId::new("admin", "purge_sessions"),
                delete(admin::purge_sessions),
            ),
        )
}
