//! The gate itself: pre-operation access checks, login and logout.
//!
//! Per request the gate moves through
//! `Entering -> ResolvingPolicy -> {Allowed, Denied} -> Dispatched -> {Completed, Aborted}`.
//! Nothing is kept across requests; all mutable state lives in the
//! [`RequestContext`] the host passes in.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use gatekeep_core::{PrincipalId, Reply};

use crate::settings::ConfigError;
use crate::{
    AuthError, AuthSettings, CheckFailed, Decision, HookName, HookRegistry, IDENTITY_KEY, OperationId,
    PolicyRegistry, REMEMBER_COOKIE, RememberError, RememberToken, RequestContext, RunMode, SecurityHooks,
    SessionStore, TokenSigner,
};

/// Global error code added when credentials are refused.
pub const LOGIN_ERROR: &str = "login.error";

/// Login parameters as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub remember: bool,
}

/// Result of the pre-operation check.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Allowed,
    /// The request must stop here with this reply.
    Denied(Reply),
}

/// Result of a fully guarded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Completed(Reply),
    Aborted(Reply),
}

impl Dispatched {
    pub fn reply(&self) -> &Reply {
        match self {
            Dispatched::Completed(r) | Dispatched::Aborted(r) => r,
        }
    }

    pub fn into_reply(self) -> Reply {
        match self {
            Dispatched::Completed(r) | Dispatched::Aborted(r) => r,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    policies: Arc<PolicyRegistry>,
    hooks: HookRegistry,
    signer: TokenSigner,
    mode: RunMode,
    remember_duration: Duration,
}

impl AuthInterceptor {
    pub fn new(
        settings: &AuthSettings,
        policies: PolicyRegistry,
        hooks: Arc<dyn SecurityHooks>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            policies: Arc::new(policies),
            hooks: HookRegistry::new(hooks),
            signer: settings.signer()?,
            mode: settings.mode,
            remember_duration: settings.remember_duration,
        })
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Evaluate every policy that applies to `op`.
    ///
    /// Exempt operations are always allowed without consulting any hook.
    pub fn check_access(&self, op: &OperationId, session: &dyn SessionStore) -> Result<Access, AuthError> {
        if self.policies.is_exempt(op) {
            tracing::debug!("{} is exempt from access checks", op);
            return Ok(Access::Allowed);
        }

        for policy in self.policies.resolve(op) {
            let mut start = 0;
            loop {
                let decision = policy.evaluate_from(start, |profile| {
                    self.hooks.dispatch(HookName::Check, |h| h.check(profile, session))
                })?;

                let Decision::Deny { profile, position } = decision else {
                    break;
                };

                tracing::warn!("access to {} refused: missing profile '{}'", op, profile);
                match self
                    .hooks
                    .dispatch(HookName::OnCheckFailed, |h| h.on_check_failed(&profile))?
                {
                    CheckFailed::Forbid => return Ok(Access::Denied(Reply::forbidden(profile.as_str()))),
                    CheckFailed::Respond(reply) => return Ok(Access::Denied(reply)),
                    CheckFailed::Allow => {
                        tracing::info!("onCheckFailed let {} through despite '{}'", op, profile);
                        start = position + 1;
                    }
                }
            }
        }

        Ok(Access::Allowed)
    }

    pub fn before(&self, op: &OperationId, session: &dyn SessionStore) -> Result<(), AuthError> {
        self.hooks.dispatch(HookName::Before, |h| h.before(op, session))
    }

    pub fn after(&self, op: &OperationId, session: &dyn SessionStore) -> Result<(), AuthError> {
        self.hooks.dispatch(HookName::After, |h| h.after(op, session))
    }

    /// Run `handler` behind the gate.
    ///
    /// Exempt operations run bare. Everything else is checked, then wrapped
    /// by the `before`/`after` hooks whether or not it carries a policy.
    pub fn dispatch<F>(&self, op: &OperationId, ctx: &mut RequestContext<'_>, handler: F) -> Result<Dispatched, AuthError>
    where
        F: FnOnce(&mut RequestContext<'_>) -> anyhow::Result<Reply>,
    {
        if self.policies.is_exempt(op) {
            let reply = handler(ctx).map_err(AuthError::Operation)?;
            return Ok(Dispatched::Completed(reply));
        }

        if let Access::Denied(reply) = self.check_access(op, &*ctx.session)? {
            return Ok(Dispatched::Aborted(reply));
        }

        self.before(op, &*ctx.session)?;
        let reply = handler(ctx).map_err(AuthError::Operation)?;
        self.after(op, &*ctx.session)?;
        Ok(Dispatched::Completed(reply))
    }

    /// The connected principal for `op`, unless `op` is marked unsecure.
    pub fn connected_for(&self, op: &OperationId, session: &dyn SessionStore) -> Option<PrincipalId> {
        if self.policies.is_unsecure(op) {
            return None;
        }
        crate::connected(session)
    }

    /// The login flow.
    pub fn authenticate(&self, form: &LoginForm, ctx: &mut RequestContext<'_>) -> Result<Reply, AuthError> {
        ctx.validation.required("username", form.username.as_deref());
        // Dev mode only: a missing password is coerced to "".
        if !self.mode.is_dev() {
            ctx.validation.required("password", form.password.as_deref());
        }
        let password = form.password.clone().unwrap_or_default();

        let username = match form.username.as_deref() {
            Some(username) if !ctx.validation.has_errors() => username,
            _ => {
                ctx.transaction.mark_rollback_only();
                return Ok(Reply::bad_request(ctx.validation.errors_map()));
            }
        };

        let principal = self
            .hooks
            .dispatch(HookName::Authenticate, |h| h.authenticate(username, &password))?;
        let Some(principal) = principal else {
            tracing::info!("login refused for '{}'", username);
            ctx.validation.add_global_error(LOGIN_ERROR);
            ctx.transaction.mark_rollback_only();
            return Ok(Reply::forbidden_errors(ctx.validation.errors_map()));
        };

        ctx.session.put(IDENTITY_KEY, principal.to_string());
        tracing::info!("'{}' connected as {}", username, principal);

        if form.remember {
            let token = self.issue_remember_token(username, Utc::now())?;
            ctx.cookies
                .set_cookie(REMEMBER_COOKIE, token.to_string(), self.remember_duration);
        }

        self.hooks
            .dispatch(HookName::AfterAuthenticate, |h| h.after_authenticate(&principal))?;

        Ok(Reply::ok())
    }

    /// The logout flow. A failing hook stops it before the later steps.
    pub fn logout(&self, ctx: &mut RequestContext<'_>) -> Result<Reply, AuthError> {
        self.hooks
            .dispatch(HookName::OnDisconnect, |h| h.on_disconnect(&*ctx.session))?;
        let who = crate::connected(&*ctx.session);
        ctx.session.clear();
        ctx.cookies.remove_cookie(REMEMBER_COOKIE);
        self.hooks.dispatch(HookName::OnDisconnected, |h| h.on_disconnected())?;

        match who {
            Some(principal) => tracing::info!("{} disconnected", principal),
            None => tracing::debug!("logout without a connected principal"),
        }
        Ok(Reply::ok())
    }

    /// Sign a remember token for `username`, expiring one remember duration after `now`.
    pub fn issue_remember_token(&self, username: &str, now: DateTime<Utc>) -> Result<RememberToken, ConfigError> {
        let out_of_range = || ConfigError::InvalidDuration {
            value: format!("{}s", self.remember_duration.as_secs()),
            reason: "expiration out of range".to_string(),
        };
        let lifetime = TimeDelta::from_std(self.remember_duration).map_err(|_| out_of_range())?;
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(out_of_range)?;
        Ok(RememberToken::issue(&self.signer, username, expires_at))
    }

    /// Validate a presented `rememberme` cookie and return the remembered username.
    ///
    /// This is the login name, not the principal id `authenticate` stores
    /// under [`IDENTITY_KEY`]; use [`AuthInterceptor::restore_remembered`] to
    /// reconnect a session.
    pub fn remembered_username(&self, raw: &str, now: DateTime<Utc>) -> Result<String, RememberError> {
        let token = RememberToken::parse(raw)?;
        token.verify(&self.signer, now).map(str::to_string)
    }

    /// Reconnect `session` from a `rememberme` cookie.
    ///
    /// The `remembered` hook maps the token's username to the principal
    /// stored under [`IDENTITY_KEY`]. Invalid or expired tokens, and usernames
    /// the hook no longer knows, leave the session untouched.
    pub fn restore_remembered(
        &self,
        raw: &str,
        now: DateTime<Utc>,
        session: &mut dyn SessionStore,
    ) -> Result<Option<PrincipalId>, AuthError> {
        let username = match self.remembered_username(raw, now) {
            Ok(username) => username,
            Err(e) => {
                tracing::debug!("ignoring remember cookie: {e}");
                return Ok(None);
            }
        };

        let principal = self
            .hooks
            .dispatch(HookName::Remembered, |h| h.remembered(&username))?;
        match &principal {
            Some(principal) => {
                session.put(IDENTITY_KEY, principal.to_string());
                tracing::info!("'{}' reconnected as {} from remember cookie", username, principal);
            }
            None => tracing::info!("remember cookie for unknown user '{}' ignored", username),
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use gatekeep_core::{GLOBAL_KEY, Status, Validation};

    use crate::{AccessPolicy, CookieBuffer, CookieChange, MapConfig, MemorySession, Profile, RollbackFlag};
    use crate::settings::{MODE_KEY, REMEMBER_DURATION_KEY, SECRET_KEY};

    /// Hooks that record every call and grant a fixed profile set.
    struct Recorder {
        calls: Mutex<Vec<String>>,
        grants: HashSet<&'static str>,
        on_failed: CheckFailed,
        fail_on: Option<HookName>,
    }

    impl Recorder {
        fn granting(grants: &[&'static str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                grants: grants.iter().copied().collect(),
                on_failed: CheckFailed::Forbid,
                fail_on: None,
            }
        }

        fn record(&self, name: HookName, detail: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("{name}:{detail}"));
            if self.fail_on == Some(name) {
                anyhow::bail!("{name} exploded");
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SecurityHooks for Recorder {
        fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<PrincipalId>> {
            self.record(HookName::Authenticate, &format!("{username}/{password}"))?;
            match (username, password) {
                ("alice", "secret") => Ok(Some(PrincipalId::new("u-1")?)),
                ("dev", "") => Ok(Some(PrincipalId::new("u-dev")?)),
                _ => Ok(None),
            }
        }

        fn check(&self, profile: &Profile, _session: &dyn SessionStore) -> anyhow::Result<bool> {
            self.record(HookName::Check, profile.as_str())?;
            Ok(self.grants.contains(profile.as_str()))
        }

        fn before(&self, op: &OperationId, _session: &dyn SessionStore) -> anyhow::Result<()> {
            self.record(HookName::Before, &op.to_string())
        }

        fn after(&self, op: &OperationId, _session: &dyn SessionStore) -> anyhow::Result<()> {
            self.record(HookName::After, &op.to_string())
        }

        fn after_authenticate(&self, principal: &PrincipalId) -> anyhow::Result<()> {
            self.record(HookName::AfterAuthenticate, principal.as_str())
        }

        fn remembered(&self, username: &str) -> anyhow::Result<Option<PrincipalId>> {
            self.record(HookName::Remembered, username)?;
            match username {
                "alice" => Ok(Some(PrincipalId::new("u-1")?)),
                _ => Ok(None),
            }
        }

        fn on_disconnect(&self, session: &dyn SessionStore) -> anyhow::Result<()> {
            let who = session.get(IDENTITY_KEY).unwrap_or_default();
            self.record(HookName::OnDisconnect, &who)
        }

        fn on_disconnected(&self) -> anyhow::Result<()> {
            self.record(HookName::OnDisconnected, "")
        }

        fn on_check_failed(&self, profile: &Profile) -> anyhow::Result<CheckFailed> {
            self.record(HookName::OnCheckFailed, profile.as_str())?;
            Ok(self.on_failed.clone())
        }
    }

    struct Request {
        session: MemorySession,
        cookies: CookieBuffer,
        validation: Validation,
        tx: RollbackFlag,
    }

    impl Request {
        fn new() -> Self {
            Self {
                session: MemorySession::new(),
                cookies: CookieBuffer::new(),
                validation: Validation::new(),
                tx: RollbackFlag::new(),
            }
        }

        fn ctx(&mut self) -> RequestContext<'_> {
            RequestContext::new(&mut self.session, &mut self.cookies, &mut self.validation, &mut self.tx)
        }
    }

    fn settings(mode: &str) -> AuthSettings {
        AuthSettings::from_source(
            &MapConfig::new()
                .with(SECRET_KEY, "interceptor-secret")
                .with(MODE_KEY, mode)
                .with(REMEMBER_DURATION_KEY, "30d"),
        )
        .unwrap()
    }

    fn admin_registry() -> PolicyRegistry {
        PolicyRegistry::builder()
            .group("admin", AccessPolicy::new(["admin"]).unwrap())
            .operation(
                OperationId::new("admin", "purge"),
                AccessPolicy::new(["superuser", "auditor"]).unwrap(),
            )
            .unsecure_group("system")
            .build()
    }

    fn gate(hooks: Arc<Recorder>, registry: PolicyRegistry, mode: &str) -> AuthInterceptor {
        AuthInterceptor::new(&settings(mode), registry, hooks).unwrap()
    }

    fn login(username: Option<&str>, password: Option<&str>, remember: bool) -> LoginForm {
        LoginForm {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            remember,
        }
    }

    #[test]
    fn exempt_operations_never_reach_check() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let registry = PolicyRegistry::builder()
            .group("auth", AccessPolicy::new(["admin"]).unwrap())
            .build();
        let gate = gate(hooks.clone(), registry, "prod");
        let session = MemorySession::new();

        for action in ["login", "authenticate", "logout"] {
            let access = gate.check_access(&OperationId::new("auth", action), &session).unwrap();
            assert_eq!(access, Access::Allowed);
        }
        assert!(hooks.calls().is_empty());
    }

    #[test]
    fn denial_stops_at_first_refused_profile() {
        let hooks = Arc::new(Recorder::granting(&["admin"]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");

        let access = gate
            .check_access(&OperationId::new("admin", "purge"), &MemorySession::new())
            .unwrap();
        assert_eq!(access, Access::Denied(Reply::forbidden("superuser")));
        assert_eq!(hooks.calls(), vec!["check:superuser", "onCheckFailed:superuser"]);
    }

    #[test]
    fn group_policy_still_applies_when_operation_policy_passes() {
        let hooks = Arc::new(Recorder::granting(&["superuser", "auditor"]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");

        let access = gate
            .check_access(&OperationId::new("admin", "purge"), &MemorySession::new())
            .unwrap();
        assert_eq!(access, Access::Denied(Reply::forbidden("admin")));
        assert_eq!(
            hooks.calls(),
            vec!["check:superuser", "check:auditor", "check:admin", "onCheckFailed:admin"]
        );
    }

    #[test]
    fn both_policies_pass() {
        let hooks = Arc::new(Recorder::granting(&["superuser", "auditor", "admin"]));
        let gate = gate(hooks, admin_registry(), "prod");
        let access = gate
            .check_access(&OperationId::new("admin", "purge"), &MemorySession::new())
            .unwrap();
        assert_eq!(access, Access::Allowed);
    }

    #[test]
    fn check_failed_override_can_respond_or_allow() {
        let mut redirecting = Recorder::granting(&[]);
        redirecting.on_failed = CheckFailed::Respond(Reply::redirect("/login"));
        let gate_r = gate(Arc::new(redirecting), admin_registry(), "prod");
        let access = gate_r
            .check_access(&OperationId::new("admin", "stats"), &MemorySession::new())
            .unwrap();
        assert_eq!(access, Access::Denied(Reply::redirect("/login")));

        let mut lenient = Recorder::granting(&["auditor"]);
        lenient.on_failed = CheckFailed::Allow;
        let hooks = Arc::new(lenient);
        let gate_a = gate(hooks.clone(), admin_registry(), "prod");
        let access = gate_a
            .check_access(&OperationId::new("admin", "purge"), &MemorySession::new())
            .unwrap();
        assert_eq!(access, Access::Allowed);
        assert_eq!(
            hooks.calls(),
            vec![
                "check:superuser",
                "onCheckFailed:superuser",
                "check:auditor",
                "check:admin",
                "onCheckFailed:admin",
            ]
        );
    }

    #[test]
    fn dispatch_wraps_unpoliced_operations_with_before_and_after() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();
        let op = OperationId::new("reports", "list");

        let out = gate
            .dispatch(&op, &mut req.ctx(), |_| Ok(Reply::ok()))
            .unwrap();
        assert_eq!(out, Dispatched::Completed(Reply::ok()));
        assert_eq!(hooks.calls(), vec!["before:reports.list", "after:reports.list"]);
    }

    #[test]
    fn dispatch_aborts_without_running_the_handler() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();
        let mut ran = false;

        let out = gate
            .dispatch(&OperationId::new("admin", "stats"), &mut req.ctx(), |_| {
                ran = true;
                Ok(Reply::ok())
            })
            .unwrap();
        assert!(!ran);
        assert_eq!(out.reply().status, Status::FORBIDDEN);
        assert!(matches!(out, Dispatched::Aborted(_)));
        assert!(!hooks.calls().iter().any(|c| c.starts_with("before")));
    }

    #[test]
    fn dispatch_skips_hooks_for_exempt_operations() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();

        let out = gate
            .dispatch(&OperationId::new("auth", "logout"), &mut req.ctx(), |_| Ok(Reply::ok()))
            .unwrap();
        assert_eq!(out.into_reply(), Reply::ok());
        assert!(hooks.calls().is_empty());
    }

    #[test]
    fn successful_login_without_remember() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();

        let reply = gate
            .authenticate(&login(Some("alice"), Some("secret"), false), &mut req.ctx())
            .unwrap();

        assert_eq!(reply, Reply::ok());
        assert_eq!(req.session.get(IDENTITY_KEY).as_deref(), Some("u-1"));
        assert!(req.cookies.last(REMEMBER_COOKIE).is_none());
        assert!(!req.tx.is_rollback_only());
        assert_eq!(
            hooks.calls(),
            vec!["authenticate:alice/secret", "afterAuthenticate:u-1"]
        );
    }

    #[test]
    fn wrong_password_is_forbidden_with_global_error() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();

        let reply = gate
            .authenticate(&login(Some("alice"), Some("wrong"), false), &mut req.ctx())
            .unwrap();

        assert_eq!(reply.status, Status::FORBIDDEN);
        assert_eq!(reply.body[GLOBAL_KEY][0]["message"], LOGIN_ERROR);
        assert!(req.session.is_empty());
        assert!(!req.session.is_dirty());
        assert!(req.tx.is_rollback_only());
        assert!(!hooks.calls().iter().any(|c| c.starts_with("afterAuthenticate")));
    }

    #[test]
    fn missing_username_is_a_bad_request() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();

        let reply = gate
            .authenticate(&login(None, Some("x"), false), &mut req.ctx())
            .unwrap();

        assert_eq!(reply.status, Status::BAD_REQUEST);
        assert_eq!(reply.body["username"][0]["message"], "validation.required");
        assert!(req.tx.is_rollback_only());
        assert!(hooks.calls().is_empty());
    }

    #[test]
    fn password_is_required_outside_dev_mode() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let prod = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();
        let reply = prod
            .authenticate(&login(Some("dev"), None, false), &mut req.ctx())
            .unwrap();
        assert_eq!(reply.status, Status::BAD_REQUEST);
        assert!(reply.body.get("password").is_some());

        let dev = gate(hooks.clone(), admin_registry(), "dev");
        let mut req = Request::new();
        let reply = dev
            .authenticate(&login(Some("dev"), None, false), &mut req.ctx())
            .unwrap();
        assert_eq!(reply, Reply::ok());
        assert_eq!(req.session.get(IDENTITY_KEY).as_deref(), Some("u-dev"));
        assert!(hooks.calls().contains(&"authenticate:dev/".to_string()));
    }

    #[test]
    fn remember_sets_a_signed_cookie_that_decomposes_back() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks, admin_registry(), "prod");
        let mut req = Request::new();

        let before = Utc::now();
        gate.authenticate(&login(Some("alice"), Some("secret"), true), &mut req.ctx())
            .unwrap();
        let after = Utc::now();

        let Some(CookieChange::Set { value, max_age, .. }) = req.cookies.last(REMEMBER_COOKIE) else {
            panic!("expected rememberme cookie");
        };
        assert_eq!(*max_age, Duration::from_secs(30 * 86_400));

        let token = RememberToken::parse(value).unwrap();
        assert_eq!(token.username(), "alice");
        let lifetime = 30 * 86_400 * 1_000;
        assert!(token.expiration_millis() >= before.timestamp_millis() + lifetime);
        assert!(token.expiration_millis() <= after.timestamp_millis() + lifetime);
        assert!(gate.signer().verify(&RememberToken::payload("alice", token.expiration_millis()), token.signature()));
        assert_eq!(gate.remembered_username(value, Utc::now()).unwrap(), "alice");
    }

    #[test]
    fn authenticate_hook_errors_propagate() {
        let mut failing = Recorder::granting(&[]);
        failing.fail_on = Some(HookName::Authenticate);
        let gate = gate(Arc::new(failing), admin_registry(), "prod");
        let mut req = Request::new();

        let err = gate
            .authenticate(&login(Some("alice"), Some("secret"), false), &mut req.ctx())
            .unwrap_err();
        assert!(matches!(err, AuthError::Hook(_)));
        assert_eq!(err.to_string(), "authenticate exploded");
        assert!(req.session.is_empty());
        assert!(!req.tx.is_rollback_only());
    }

    #[test]
    fn logout_clears_session_and_cookie() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();
        req.session.put(IDENTITY_KEY, "u-1".to_string());

        let reply = gate.logout(&mut req.ctx()).unwrap();

        assert_eq!(reply, Reply::ok());
        assert!(!req.session.contains(IDENTITY_KEY));
        assert_eq!(
            req.cookies.last(REMEMBER_COOKIE),
            Some(&CookieChange::Remove { name: REMEMBER_COOKIE.to_string() })
        );
        assert_eq!(hooks.calls(), vec!["onDisconnect:u-1", "onDisconnected:"]);
    }

    #[test]
    fn failing_on_disconnect_aborts_logout() {
        let mut failing = Recorder::granting(&[]);
        failing.fail_on = Some(HookName::OnDisconnect);
        let hooks = Arc::new(failing);
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let mut req = Request::new();
        req.session.put(IDENTITY_KEY, "u-1".to_string());

        assert!(gate.logout(&mut req.ctx()).is_err());
        assert!(req.session.contains(IDENTITY_KEY));
        assert!(req.cookies.is_empty());
        assert_eq!(hooks.calls(), vec!["onDisconnect:u-1"]);
    }

    #[test]
    fn unsecure_operations_never_load_the_principal() {
        let gate = gate(Arc::new(Recorder::granting(&[])), admin_registry(), "prod");
        let mut session = MemorySession::new();
        session.put(IDENTITY_KEY, "u-1".to_string());

        assert_eq!(gate.connected_for(&OperationId::new("system", "health"), &session), None);
        assert_eq!(
            gate.connected_for(&OperationId::new("reports", "list"), &session),
            Some(PrincipalId::new("u-1").unwrap())
        );
    }

    #[test]
    fn forged_remember_cookie_is_refused() {
        let gate = gate(Arc::new(Recorder::granting(&[])), admin_registry(), "prod");
        let token = gate.issue_remember_token("alice", Utc::now()).unwrap();
        let forged = format!("{}-mallory-{}", token.signature(), token.expiration_millis());
        assert_eq!(
            gate.remembered_username(&forged, Utc::now()),
            Err(RememberError::BadSignature)
        );
    }

    #[test]
    fn remember_cookie_reconnects_as_the_hook_principal() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let now = Utc::now();

        let token = gate.issue_remember_token("alice", now).unwrap().to_string();
        let mut session = MemorySession::new();
        let principal = gate.restore_remembered(&token, now, &mut session).unwrap();

        assert_eq!(principal, Some(PrincipalId::new("u-1").unwrap()));
        assert_eq!(session.get(IDENTITY_KEY).as_deref(), Some("u-1"));
        assert_eq!(hooks.calls(), vec!["remembered:alice"]);
    }

    #[test]
    fn unusable_remember_cookies_leave_the_session_alone() {
        let hooks = Arc::new(Recorder::granting(&[]));
        let gate = gate(hooks.clone(), admin_registry(), "prod");
        let now = Utc::now();
        let mut session = MemorySession::new();

        let unknown = gate.issue_remember_token("bob", now).unwrap().to_string();
        assert_eq!(gate.restore_remembered(&unknown, now, &mut session).unwrap(), None);

        let token = gate.issue_remember_token("alice", now).unwrap();
        let expired = token.to_string();
        let later = now + chrono::Duration::days(31);
        assert_eq!(gate.restore_remembered(&expired, later, &mut session).unwrap(), None);
        assert_eq!(gate.restore_remembered("garbage", now, &mut session).unwrap(), None);

        assert!(session.is_empty());
        assert!(!session.is_dirty());
        assert_eq!(hooks.calls(), vec!["remembered:bob"]);
    }
}
