//! Server-side session storage and cookie rendering.
//!
//! Each client carries an opaque HttpOnly session cookie; the values live in
//! [`SessionRegistry`]. The gate only ever sees a [`MemorySession`] loaded for
//! the current request.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, SameSite};
use moka::sync::Cache;

use gatekeep_auth::{CookieBuffer, CookieChange, MemorySession};
use gatekeep_core::SessionId;

/// Cookie holding the session identifier.
pub const SESSION_COOKIE: &str = "GATEKEEP_SESSION";

/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

const MAX_SESSIONS: u64 = 100_000;

/// Session loaded for one request.
#[derive(Debug)]
pub struct LoadedSession {
    id: Option<SessionId>,
    pub session: MemorySession,
}

impl LoadedSession {
    pub fn id(&self) -> Option<SessionId> {
        self.id
    }
}

/// In-memory session store shared by all requests.
///
/// Entries expire after an idle period and the store is capacity-bounded.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<SessionId, BTreeMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }

    pub fn with_idle_timeout(idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle)
            .build();
        Self { sessions }
    }

    /// Load the session referenced by the request's session cookie.
    ///
    /// Unknown, expired or malformed identifiers yield a fresh, empty session.
    pub fn load(&self, headers: &HeaderMap) -> LoadedSession {
        let id = request_cookie(headers, SESSION_COOKIE).and_then(|raw| raw.parse::<SessionId>().ok());
        let values = id.and_then(|id| self.sessions.get(&id));

        match values {
            Some(values) => LoadedSession {
                id,
                session: MemorySession::from_values(values),
            },
            None => LoadedSession {
                id: None,
                session: MemorySession::new(),
            },
        }
    }

    /// Persist a loaded session if it changed.
    ///
    /// Returns the session cookie to send back: a fresh one when a new
    /// session was created, a removal when the session was emptied.
    pub fn store(&self, loaded: LoadedSession) -> Option<Cookie<'static>> {
        if !loaded.session.is_dirty() {
            return None;
        }

        if loaded.session.is_empty() {
            let id = loaded.id?;
            self.sessions.invalidate(&id);
            tracing::debug!("session {} destroyed", id);
            return Some(removal(SESSION_COOKIE));
        }

        let (id, fresh) = match loaded.id {
            Some(id) => (id, false),
            None => (SessionId::new(), true),
        };
        self.sessions.insert(id, loaded.session.into_values());
        fresh.then(|| session_cookie(id))
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored session. Returns how many were dropped.
    pub fn purge(&self) -> usize {
        let n = self.len();
        self.sessions.invalidate_all();
        self.sessions.run_pending_tasks();
        n
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("entries", &self.sessions.entry_count())
            .finish_non_exhaustive()
    }
}

/// Decoded value of the request cookie `name`, if present.
///
/// Values are percent-decoded; raw UTF-8 header bytes are accepted as well.
pub fn request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| std::str::from_utf8(v.as_bytes()).ok())
        .flat_map(Cookie::split_parse_encoded)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

fn session_cookie(id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), ""))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

/// Render the gate's cookie changes as `Set-Cookie` cookies.
pub fn render_changes(buffer: &CookieBuffer) -> Vec<Cookie<'static>> {
    buffer
        .changes()
        .iter()
        .map(|change| match change {
            CookieChange::Set { name, value, max_age } => {
                let secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
                Cookie::build((name.clone(), value.clone()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .max_age(cookie::time::Duration::seconds(secs))
                    .build()
            }
            CookieChange::Remove { name } => removal(name),
        })
        .collect()
}

/// Append cookies to a response header map, percent-encoding names and values.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = Cookie<'static>>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.encoded().to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("dropping unrepresentable cookie '{}': {e}", cookie.name()),
        }
    }
}
