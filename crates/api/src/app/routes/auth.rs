//! Login and logout: the two operations exempt from the gate's pre-check.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use gatekeep_auth::{AuthResult, CookieBuffer, LoginForm, RequestContext, RollbackFlag};
use gatekeep_core::{Reply, Validation};

use crate::app::AppState;
use crate::app::errors::{auth_error_to_response, json_error, reply_to_response};
use crate::session::{LoadedSession, append_set_cookies, render_changes};

/// POST /authenticate
///
/// The body is read as JSON whatever its content type. An empty body is an
/// empty form, so the gate answers with its own field errors.
pub async fn authenticate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let form = match login_form(&body) {
        Ok(form) => form,
        Err(e) => {
            tracing::debug!("rejecting login body: {e}");
            return json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_body", e.to_string());
        }
    };
    with_context(&state, &headers, |ctx| state.gate.authenticate(&form, ctx))
}

fn login_form(body: &[u8]) -> Result<LoginForm, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoginForm::default());
    }
    serde_json::from_slice(body)
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    with_context(&state, &headers, |ctx| state.gate.logout(ctx))
}

/// Build a request context around the caller's session, run `f`, then
/// persist the session and flush cookie changes onto the response.
fn with_context<F>(state: &AppState, headers: &HeaderMap, f: F) -> Response
where
    F: FnOnce(&mut RequestContext<'_>) -> AuthResult<Reply>,
{
    let mut loaded: LoadedSession = state.sessions.load(headers);
    let mut cookies = CookieBuffer::new();
    let mut validation = Validation::new();
    let mut tx = RollbackFlag::new();

    let result = {
        let mut ctx = RequestContext::new(&mut loaded.session, &mut cookies, &mut validation, &mut tx);
        f(&mut ctx)
    };

    if tx.is_rollback_only() {
        tracing::debug!("request marked its transaction rollback-only");
    }

    match result {
        Ok(reply) => {
            let mut response = reply_to_response(reply);
            append_set_cookies(response.headers_mut(), state.sessions.store(loaded));
            append_set_cookies(response.headers_mut(), render_changes(&cookies));
            response
        }
        Err(e) => auth_error_to_response(e),
    }
}
