//! Demo credential store backing the binary and the black-box tests.
//!
//! Users come from a compact list: `name:password:profile|profile,...`.
//! The principal id of a user is its name.

use std::collections::{HashMap, HashSet};

use subtle::ConstantTimeEq;
use thiserror::Error;

use gatekeep_auth::{Profile, SecurityHooks, SessionStore, connected};
use gatekeep_core::PrincipalId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserListError {
    #[error("invalid user entry '{0}' (expected name:password[:profiles])")]
    InvalidEntry(String),

    #[error("duplicate user '{0}'")]
    Duplicate(String),
}

#[derive(Debug, Clone)]
struct StaticUser {
    password: String,
    profiles: HashSet<String>,
}

/// [`SecurityHooks`] over a fixed, in-memory user list.
#[derive(Debug, Clone, Default)]
pub struct StaticUsers {
    users: HashMap<String, StaticUser>,
}

impl StaticUsers {
    pub fn parse(spec: &str) -> Result<Self, UserListError> {
        let mut users = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let (Some(name), Some(password)) = (parts.next(), parts.next()) else {
                return Err(UserListError::InvalidEntry(entry.to_string()));
            };
            if name.is_empty() || password.is_empty() {
                return Err(UserListError::InvalidEntry(entry.to_string()));
            }
            let profiles = parts
                .next()
                .unwrap_or_default()
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();

            let user = StaticUser {
                password: password.to_string(),
                profiles,
            };
            if users.insert(name.to_string(), user).is_some() {
                return Err(UserListError::Duplicate(name.to_string()));
            }
        }
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl SecurityHooks for StaticUsers {
    fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<PrincipalId>> {
        let Some(user) = self.users.get(username) else {
            return Ok(None);
        };
        if bool::from(user.password.as_bytes().ct_eq(password.as_bytes())) {
            Ok(Some(PrincipalId::new(username)?))
        } else {
            Ok(None)
        }
    }

    fn remembered(&self, username: &str) -> anyhow::Result<Option<PrincipalId>> {
        if self.users.contains_key(username) {
            Ok(Some(PrincipalId::new(username)?))
        } else {
            Ok(None)
        }
    }

    fn check(&self, profile: &Profile, session: &dyn SessionStore) -> anyhow::Result<bool> {
        let granted = connected(session)
            .and_then(|principal| self.users.get(principal.as_str()))
            .is_some_and(|user| user.profiles.contains(profile.as_str()));
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_auth::{IDENTITY_KEY, MemorySession};

    #[test]
    fn parses_users_and_profiles() {
        let users = StaticUsers::parse("alice:secret:admin|superuser, bob:hunter2").unwrap();
        assert_eq!(users.len(), 2);

        assert_eq!(
            users.authenticate("alice", "secret").unwrap(),
            Some(PrincipalId::new("alice").unwrap())
        );
        assert_eq!(users.authenticate("alice", "nope").unwrap(), None);
        assert_eq!(users.authenticate("carol", "secret").unwrap(), None);

        assert_eq!(
            users.remembered("bob").unwrap(),
            Some(PrincipalId::new("bob").unwrap())
        );
        assert_eq!(users.remembered("carol").unwrap(), None);
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(matches!(StaticUsers::parse("alice"), Err(UserListError::InvalidEntry(_))));
        assert!(matches!(StaticUsers::parse(":pw"), Err(UserListError::InvalidEntry(_))));
        assert!(matches!(
            StaticUsers::parse("a:1,a:2"),
            Err(UserListError::Duplicate(_))
        ));
        assert!(StaticUsers::parse("").unwrap().is_empty());
    }

    #[test]
    fn check_uses_connected_principal() {
        let users = StaticUsers::parse("alice:secret:admin,bob:pw").unwrap();
        let admin = Profile::new("admin");

        let mut session = MemorySession::new();
        assert!(!users.check(&admin, &session).unwrap());

        session.put(IDENTITY_KEY, "bob".to_string());
        assert!(!users.check(&admin, &session).unwrap());

        session.put(IDENTITY_KEY, "alice".to_string());
        assert!(users.check(&admin, &session).unwrap());
    }
}
