use thiserror::Error;

use crate::settings::ConfigError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures the gate does not translate into a reply.
///
/// Declared outcomes (bad input, bad credentials, denied profiles) are
/// replies, not errors. What remains here propagates to the host's generic
/// error handler untouched.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An application hook failed.
    #[error(transparent)]
    Hook(#[from] anyhow::Error),

    /// The guarded operation itself failed.
    #[error(transparent)]
    Operation(anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthError {
    /// The application error carried by a hook or operation failure.
    pub fn application_error(&self) -> Option<&anyhow::Error> {
        match self {
            AuthError::Hook(e) | AuthError::Operation(e) => Some(e),
            AuthError::Config(_) => None,
        }
    }
}
