//! Per-connection key/value session facade.
//!
//! The presence of [`IDENTITY_KEY`] is the only signal that a principal is
//! connected. The gate writes it at login and clears the whole session at
//! logout; nothing else touches it.

use std::collections::BTreeMap;

use gatekeep_core::PrincipalId;

/// Session key holding the connected principal.
pub const IDENTITY_KEY: &str = "username";

/// Session storage scoped to one connected client.
pub trait SessionStore {
    fn put(&mut self, key: &str, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn clear(&mut self);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Whether a principal is connected on this session.
pub fn is_connected(session: &dyn SessionStore) -> bool {
    session.contains(IDENTITY_KEY)
}

/// The connected principal, if any.
pub fn connected(session: &dyn SessionStore) -> Option<PrincipalId> {
    session
        .get(IDENTITY_KEY)
        .and_then(|raw| PrincipalId::new(raw).ok())
}

/// In-memory session for hosts that keep sessions server-side, and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySession {
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a stored session. The result starts clean.
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        Self { values, dirty: false }
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, String> {
        self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the session changed since it was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl SessionStore for MemorySession {
    fn put(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn clear(&mut self) {
        if !self.values.is_empty() {
            self.dirty = true;
        }
        self.values.clear();
    }
}
