//! Gate configuration: signing secret, run mode, remember-me lifetime.
//!
//! Everything is read and validated once at startup. A missing secret or an
//! unparsable duration is a startup error, never a runtime fallback.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::{SignerError, TokenSigner};

pub const SECRET_KEY: &str = "application.secret";
pub const MODE_KEY: &str = "application.mode";
pub const REMEMBER_DURATION_KEY: &str = "secure.rememberme.duration";
pub const DEFAULT_REMEMBER_DURATION: &str = "30d";

/// Upper bound on the remember-me lifetime (100 years).
const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

static COMPACT_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)mi?n)?(?:(\d+)s)?$").expect("static regex")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid run mode '{0}' (expected 'dev' or 'prod')")]
    InvalidMode(String),
}

/// Key/value configuration facade.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// Reads `a.b.c` from the environment variable `A_B_C`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    pub fn var_name(key: &str) -> String {
        key.replace('.', "_").to_uppercase()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok().filter(|v| !v.is_empty())
    }
}

/// In-memory configuration (tests, embedding).
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Application run mode.
///
/// `Dev` relaxes the password requirement at login (an absent password is
/// treated as empty). Hosts must make sure production deployments never
/// run with `Dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    Dev,
    #[default]
    Prod,
}

impl RunMode {
    pub fn is_dev(self) -> bool {
        self == RunMode::Dev
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(RunMode::Dev),
            "prod" => Ok(RunMode::Prod),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Validated gate settings.
#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub mode: RunMode,
    pub remember_duration: Duration,
}

impl AuthSettings {
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let secret = source
            .get(SECRET_KEY)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(SECRET_KEY))?;
        let mode: RunMode = source.get_or(MODE_KEY, "prod").parse()?;
        let remember_duration =
            parse_duration(&source.get_or(REMEMBER_DURATION_KEY, DEFAULT_REMEMBER_DURATION))?;

        if mode.is_dev() {
            tracing::warn!("running in dev mode: login accepts a missing password as empty");
        }

        Ok(Self {
            secret,
            mode,
            remember_duration,
        })
    }

    pub fn signer(&self) -> Result<TokenSigner, ConfigError> {
        Ok(TokenSigner::new(&self.secret)?)
    }
}

impl core::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"<redacted>")
            .field("mode", &self.mode)
            .field("remember_duration", &self.remember_duration)
            .finish()
    }
}

/// Parse a human duration into whole seconds.
///
/// Accepts the compact `1d2h30mn10s` family (`mn` and `min` both mean
/// minutes) and anything `humantime` understands (`2weeks`, `1h 30min`, ...).
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    let duration = match compact_seconds(trimmed) {
        Some(secs) => Duration::from_secs(secs.ok_or_else(|| invalid("overflow"))?),
        None => humantime::parse_duration(trimmed).map_err(|e| invalid(&e.to_string()))?,
    };

    let duration = Duration::from_secs(duration.as_secs());
    if duration.is_zero() {
        return Err(invalid("must be at least one second"));
    }
    if duration > MAX_DURATION {
        return Err(invalid("too long"));
    }
    Ok(duration)
}

/// `None` when `value` is not in compact form; `Some(None)` on overflow.
fn compact_seconds(value: &str) -> Option<Option<u64>> {
    let caps = COMPACT_DURATION.captures(value)?;
    const UNITS: [u64; 4] = [86_400, 3_600, 60, 1];

    let mut total: u64 = 0;
    let mut matched = false;
    for (i, unit) in UNITS.iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            matched = true;
            let Ok(n) = m.as_str().parse::<u64>() else {
                return Some(None);
            };
            let Some(next) = n.checked_mul(*unit).and_then(|s| total.checked_add(s)) else {
                return Some(None);
            };
            total = next;
        }
    }
    matched.then_some(Some(total))
}
