use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Named authorization capability checked by the `check` hook.
///
/// Profiles are intentionally opaque strings at this layer; what a profile
/// means (a role, a permission, a feature flag) is decided by the
/// application's hook implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Cow<'static, str>);

impl Profile {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Profile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Profile {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Profile {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
