//! Signed "remember me" token: `<signature>-<username>-<expirationEpochMillis>`.
//!
//! `signature = sign("<username>-<expirationEpochMillis>")`. The signature is
//! lowercase hex and the expiration is decimal, so the username is whatever
//! sits between the first and the last `-` (usernames may contain dashes).

use chrono::{DateTime, Utc};
use thiserror::Error;

use gatekeep_core::CoreError;

use crate::TokenSigner;

/// Name of the persistent login cookie.
pub const REMEMBER_COOKIE: &str = "rememberme";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RememberError {
    #[error(transparent)]
    Malformed(#[from] CoreError),

    #[error("remember token signature mismatch")]
    BadSignature,

    #[error("remember token has expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberToken {
    signature: String,
    username: String,
    expiration_millis: i64,
}

impl RememberToken {
    /// Sign a fresh token for `username` expiring at `expires_at`.
    pub fn issue(signer: &TokenSigner, username: &str, expires_at: DateTime<Utc>) -> Self {
        let expiration_millis = expires_at.timestamp_millis();
        let signature = signer.sign(&Self::payload(username, expiration_millis));
        Self {
            signature,
            username: username.to_string(),
            expiration_millis,
        }
    }

    /// The signed part of the token.
    pub fn payload(username: &str, expiration_millis: i64) -> String {
        format!("{username}-{expiration_millis}")
    }

    pub fn parse(raw: &str) -> Result<Self, RememberError> {
        let (signature, rest) = raw
            .split_once('-')
            .ok_or_else(|| CoreError::malformed_token("missing signature separator"))?;
        let (username, millis) = rest
            .rsplit_once('-')
            .ok_or_else(|| CoreError::malformed_token("missing expiration separator"))?;

        if signature.is_empty() {
            return Err(CoreError::malformed_token("empty signature").into());
        }
        if username.is_empty() {
            return Err(CoreError::malformed_token("empty username").into());
        }
        let expiration_millis: i64 = millis
            .parse()
            .map_err(|_| CoreError::malformed_token(format!("invalid expiration '{millis}'")))?;

        Ok(Self {
            signature: signature.to_string(),
            username: username.to_string(),
            expiration_millis,
        })
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn expiration_millis(&self) -> i64 {
        self.expiration_millis
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expiration_millis)
    }

    /// Check signature, then expiration. Returns the remembered username.
    pub fn verify(&self, signer: &TokenSigner, now: DateTime<Utc>) -> Result<&str, RememberError> {
        let payload = Self::payload(&self.username, self.expiration_millis);
        if !signer.verify(&payload, &self.signature) {
            return Err(RememberError::BadSignature);
        }
        if now.timestamp_millis() >= self.expiration_millis {
            return Err(RememberError::Expired);
        }
        Ok(&self.username)
    }
}

impl core::fmt::Display for RememberToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}-{}", self.signature, self.username, self.expiration_millis)
    }
}
