//! Explicit per-request context handed to every gate call.
//!
//! Hosts own the concrete session, cookie and transaction objects; the gate
//! only sees them through these facades.

use std::time::Duration;

use gatekeep_core::Validation;

use crate::SessionStore;

/// Response cookie facade.
pub trait CookieJar {
    fn set_cookie(&mut self, name: &str, value: String, max_age: Duration);
    fn remove_cookie(&mut self, name: &str);
}

/// Transactional resource the gate may poison, but never begins or commits.
pub trait Transaction {
    fn mark_rollback_only(&mut self);
}

/// Everything the gate may read or mutate while handling one request.
pub struct RequestContext<'a> {
    pub session: &'a mut dyn SessionStore,
    pub cookies: &'a mut dyn CookieJar,
    pub validation: &'a mut Validation,
    pub transaction: &'a mut dyn Transaction,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        session: &'a mut dyn SessionStore,
        cookies: &'a mut dyn CookieJar,
        validation: &'a mut Validation,
        transaction: &'a mut dyn Transaction,
    ) -> Self {
        Self {
            session,
            cookies,
            validation,
            transaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set {
        name: String,
        value: String,
        max_age: Duration,
    },
    Remove {
        name: String,
    },
}

impl CookieChange {
    pub fn name(&self) -> &str {
        match self {
            CookieChange::Set { name, .. } | CookieChange::Remove { name } => name,
        }
    }
}

/// Records cookie changes in order; hosts render them onto the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieBuffer {
    changes: Vec<CookieChange>,
}

impl CookieBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> &[CookieChange] {
        &self.changes
    }

    /// The last change recorded for `name`.
    pub fn last(&self, name: &str) -> Option<&CookieChange> {
        self.changes.iter().rev().find(|c| c.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl CookieJar for CookieBuffer {
    fn set_cookie(&mut self, name: &str, value: String, max_age: Duration) {
        self.changes.push(CookieChange::Set {
            name: name.to_string(),
            value,
            max_age,
        });
    }

    fn remove_cookie(&mut self, name: &str) {
        self.changes.push(CookieChange::Remove { name: name.to_string() });
    }
}

/// Transaction stand-in that only remembers whether it was poisoned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackFlag {
    rollback_only: bool,
}

impl RollbackFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }
}

impl Transaction for RollbackFlag {
    fn mark_rollback_only(&mut self) {
        self.rollback_only = true;
    }
}
