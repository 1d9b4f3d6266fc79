//! `gatekeep-auth` — request authentication/authorization gate.
//!
//! This crate is intentionally decoupled from HTTP and storage: hosts hand
//! the gate a [`RequestContext`] (session, cookie jar, validation collector,
//! transactional resource) and map the returned [`gatekeep_core::Reply`]
//! onto their transport.

pub mod context;
pub mod error;
pub mod hooks;
pub mod interceptor;
pub mod policy;
pub mod profile;
pub mod remember;
pub mod session;
pub mod settings;
pub mod signer;

pub use context::{CookieBuffer, CookieChange, CookieJar, RequestContext, RollbackFlag, Transaction};
pub use error::{AuthError, AuthResult};
pub use hooks::{CheckFailed, DefaultHooks, HookName, HookRegistry, SecurityHooks};
pub use interceptor::{Access, AuthInterceptor, Dispatched, LoginForm};
pub use policy::{AccessPolicy, Decision, ExemptOperations, OperationId, PolicyRegistry, PolicyRegistryBuilder};
pub use profile::Profile;
pub use remember::{REMEMBER_COOKIE, RememberError, RememberToken};
pub use session::{IDENTITY_KEY, MemorySession, SessionStore, connected, is_connected};
pub use settings::{AuthSettings, ConfigError, ConfigSource, EnvConfig, MapConfig, RunMode, parse_duration};
pub use signer::{SignerError, TokenSigner};
