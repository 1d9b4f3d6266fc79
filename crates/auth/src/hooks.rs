//! Application override points.
//!
//! Applications implement [`SecurityHooks`] and override only the methods
//! they care about; every method has a default. [`HookRegistry`] is the single
//! place the gate goes through to reach them.

use std::str::FromStr;
use std::sync::Arc;

use gatekeep_core::{CoreError, PrincipalId, Reply};

use crate::{AuthError, OperationId, Profile, SessionStore};

/// What to do after a profile check failed.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckFailed {
    /// Abort with the default access-forbidden reply.
    Forbid,
    /// Abort with this reply instead (redirect, custom body, ...).
    Respond(Reply),
    /// Let the request through as if the profile had been granted.
    Allow,
}

/// Capability set consulted by the gate.
///
/// Errors returned from any hook propagate to the host unchanged.
pub trait SecurityHooks: Send + Sync {
    /// Check credentials against the application's store.
    ///
    /// Returns the principal to mark as connected, or `None` for bad
    /// credentials. The default refuses everyone.
    fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<PrincipalId>> {
        let _ = (username, password);
        Ok(None)
    }

    /// Whether the current session holds `profile`. The default grants everything.
    fn check(&self, profile: &Profile, session: &dyn SessionStore) -> anyhow::Result<bool> {
        let _ = (profile, session);
        Ok(true)
    }

    /// Runs before every non-exempt operation that passed its checks.
    fn before(&self, op: &OperationId, session: &dyn SessionStore) -> anyhow::Result<()> {
        let _ = (op, session);
        Ok(())
    }

    /// Runs after every non-exempt operation completed.
    fn after(&self, op: &OperationId, session: &dyn SessionStore) -> anyhow::Result<()> {
        let _ = (op, session);
        Ok(())
    }

    fn after_authenticate(&self, principal: &PrincipalId) -> anyhow::Result<()> {
        let _ = principal;
        Ok(())
    }

    /// Map the username carried by a valid `rememberme` cookie to the
    /// principal to mark as connected, or `None` to ignore the cookie.
    ///
    /// The default treats the username itself as the principal id, which is
    /// only right when `authenticate` does the same.
    fn remembered(&self, username: &str) -> anyhow::Result<Option<PrincipalId>> {
        Ok(PrincipalId::new(username).ok())
    }

    /// Runs at logout while the session is still populated.
    fn on_disconnect(&self, session: &dyn SessionStore) -> anyhow::Result<()> {
        let _ = session;
        Ok(())
    }

    /// Runs at logout once the session and the remember cookie are gone.
    fn on_disconnected(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_check_failed(&self, profile: &Profile) -> anyhow::Result<CheckFailed> {
        let _ = profile;
        Ok(CheckFailed::Forbid)
    }
}

impl<H> SecurityHooks for Arc<H>
where
    H: SecurityHooks + ?Sized,
{
    fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<PrincipalId>> {
        (**self).authenticate(username, password)
    }

    fn check(&self, profile: &Profile, session: &dyn SessionStore) -> anyhow::Result<bool> {
        (**self).check(profile, session)
    }

    fn before(&self, op: &OperationId, session: &dyn SessionStore) -> anyhow::Result<()> {
        (**self).before(op, session)
    }

    fn after(&self, op: &OperationId, session: &dyn SessionStore) -> anyhow::Result<()> {
        (**self).after(op, session)
    }

    fn after_authenticate(&self, principal: &PrincipalId) -> anyhow::Result<()> {
        (**self).after_authenticate(principal)
    }

    fn remembered(&self, username: &str) -> anyhow::Result<Option<PrincipalId>> {
        (**self).remembered(username)
    }

    fn on_disconnect(&self, session: &dyn SessionStore) -> anyhow::Result<()> {
        (**self).on_disconnect(session)
    }

    fn on_disconnected(&self) -> anyhow::Result<()> {
        (**self).on_disconnected()
    }

    fn on_check_failed(&self, profile: &Profile) -> anyhow::Result<CheckFailed> {
        (**self).on_check_failed(profile)
    }
}

/// The built-in behavior: nobody authenticates, every check passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl SecurityHooks for DefaultHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    Authenticate,
    Check,
    Before,
    After,
    AfterAuthenticate,
    Remembered,
    OnDisconnect,
    OnDisconnected,
    OnCheckFailed,
}

impl HookName {
    pub const ALL: [HookName; 9] = [
        HookName::Authenticate,
        HookName::Check,
        HookName::Before,
        HookName::After,
        HookName::AfterAuthenticate,
        HookName::Remembered,
        HookName::OnDisconnect,
        HookName::OnDisconnected,
        HookName::OnCheckFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookName::Authenticate => "authenticate",
            HookName::Check => "check",
            HookName::Before => "before",
            HookName::After => "after",
            HookName::AfterAuthenticate => "afterAuthenticate",
            HookName::Remembered => "remembered",
            HookName::OnDisconnect => "onDisconnect",
            HookName::OnDisconnected => "onDisconnected",
            HookName::OnCheckFailed => "onCheckFailed",
        }
    }
}

impl core::fmt::Display for HookName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookName::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| CoreError::invalid_id(format!("HookName: unknown hook '{s}'")))
    }
}

/// Resolves hooks for the gate: the application's overrides if any, else
/// [`DefaultHooks`].
#[derive(Clone)]
pub struct HookRegistry {
    hooks: Arc<dyn SecurityHooks>,
}

impl HookRegistry {
    pub fn new(hooks: Arc<dyn SecurityHooks>) -> Self {
        Self { hooks }
    }

    /// The hook set currently in effect.
    pub fn resolve(&self) -> &dyn SecurityHooks {
        self.hooks.as_ref()
    }

    /// Invoke one hook. Its error is wrapped as [`AuthError::Hook`] without
    /// being inspected.
    pub fn dispatch<T>(
        &self,
        name: HookName,
        invoke: impl FnOnce(&dyn SecurityHooks) -> anyhow::Result<T>,
    ) -> Result<T, AuthError> {
        tracing::debug!("dispatching hook {}", name);
        invoke(self.resolve()).map_err(|e| {
            tracing::debug!("hook {} failed: {e:#}", name);
            AuthError::Hook(e)
        })
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(Arc::new(DefaultHooks))
    }
}

impl core::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookRegistry").finish_non_exhaustive()
    }
}
