//! HTTP application wiring (Axum router + gate wiring).
//!
//! - `users.rs`: demo credential store implementing the gate hooks
//! - `routes/`: HTTP routes + handlers (one file per operation group)
//! - `errors.rs`: reply and error mapping

use std::sync::Arc;

use axum::{Router, routing::MethodRouter};

use gatekeep_auth::{
    AccessPolicy, AuthInterceptor, AuthSettings, ConfigError, OperationId, PolicyRegistry, SecurityHooks,
};
use gatekeep_core::CoreError;

use crate::middleware::{self, Guard};
use crate::session::SessionRegistry;

pub mod errors;
pub mod routes;
pub mod users;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthInterceptor>,
    pub sessions: SessionRegistry,
}

/// Access policies of the bundled routes.
///
/// Every `admin.*` operation needs `admin`; purging sessions additionally
/// needs `superuser`. The `system` group never loads the caller.
pub fn policies() -> Result<PolicyRegistry, CoreError> {
    Ok(PolicyRegistry::builder()
        .group("admin", AccessPolicy::new(["admin"])?)
        .operation(
            OperationId::new("admin", "purge_sessions"),
            AccessPolicy::new(["superuser"])?,
        )
        .unsecure_group("system")
        .build())
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(
    settings: &AuthSettings,
    hooks: Arc<dyn SecurityHooks>,
    sessions: SessionRegistry,
) -> Result<Router, BuildError> {
    let gate = AuthInterceptor::new(settings, policies()?, hooks)?;
    let state = AppState {
        gate: Arc::new(gate),
        sessions,
    };
    Ok(routes::router(&state).with_state(state))
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] CoreError),
}

/// Put `route` behind the gate as operation `op`.
pub fn guarded(state: &AppState, op: OperationId, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let guard = Guard {
        state: state.clone(),
        op,
    };
    route.layer(axum::middleware::from_fn_with_state(guard, middleware::gate))
}
