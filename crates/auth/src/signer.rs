//! Tamper-evident signatures for cleartext payloads.
//!
//! HMAC-SHA256 over the payload, rendered as lowercase hex. The payload
//! travels next to its signature; only integrity is protected.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Process-wide signer keyed by the application secret.
///
/// Read-only after construction; clone it freely.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl TokenSigner {
    /// Build a signer. An empty secret is refused so that no signer can
    /// ever exist that would accept forged signatures.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignerError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Deterministic signature of `payload` for this secret.
    pub fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the signature of `payload` and compare in constant time.
    pub fn verify(&self, payload: &str, signature: &str) -> bool {
        let expected = self.sign(payload);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

impl core::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenSigner").field("mac", &"HMAC-SHA256(<redacted>)").finish()
    }
}
