use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gatekeep_auth::{Access, OperationId, REMEMBER_COOKIE, is_connected};

use crate::app::AppState;
use crate::app::errors::{auth_error_to_response, reply_to_response};
use crate::context::CallerContext;
use crate::session::{append_set_cookies, request_cookie};

/// State of one gate layer: the shared app state plus the operation the
/// wrapped route implements.
#[derive(Clone)]
pub struct Guard {
    pub state: AppState,
    pub op: OperationId,
}

/// Runs the gate around one route.
///
/// Exempt operations pass straight through. Everything else is checked,
/// then wrapped by the `before`/`after` hooks. A valid `rememberme` cookie
/// re-establishes the session of a returning client before the check.
pub async fn gate(State(guard): State<Guard>, mut req: Request, next: Next) -> Response {
    let Guard { state, op } = guard;

    if state.gate.policies().is_exempt(&op) {
        return next.run(req).await;
    }

    let mut loaded = state.sessions.load(req.headers());
    if !is_connected(&loaded.session) {
        if let Some(raw) = request_cookie(req.headers(), REMEMBER_COOKIE) {
            if let Err(e) = state.gate.restore_remembered(&raw, Utc::now(), &mut loaded.session) {
                return auth_error_to_response(e);
            }
        }
    }

    let access = match state.gate.check_access(&op, &loaded.session) {
        Ok(access) => access,
        Err(e) => return auth_error_to_response(e),
    };

    let mut response = match access {
        Access::Denied(reply) => reply_to_response(reply),
        Access::Allowed => {
            if let Err(e) = state.gate.before(&op, &loaded.session) {
                return auth_error_to_response(e);
            }

            let caller = CallerContext::new(op.clone(), state.gate.connected_for(&op, &loaded.session));
            req.extensions_mut().insert(caller);
            let response = next.run(req).await;

            if let Err(e) = state.gate.after(&op, &loaded.session) {
                return auth_error_to_response(e);
            }
            response
        }
    };

    append_set_cookies(response.headers_mut(), state.sessions.store(loaded));
    response
}
