//! Transport-neutral JSON replies produced by the gate.
//!
//! Hosts map these onto their HTTP framework; the gate itself never renders
//! HTML.

use serde::Serialize;
use serde_json::{Value, json};

use crate::validation::{ErrorMap, normalize_error_map};

/// HTTP-style status code carried by a [`Reply`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Status(u16);

impl Status {
    pub const OK: Status = Status(200);
    pub const FOUND: Status = Status(302);
    pub const BAD_REQUEST: Status = Status(400);
    pub const FORBIDDEN: Status = Status(403);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A status code, a JSON body and an optional redirect target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub status: Status,
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Reply {
    pub fn json(status: Status, body: Value) -> Self {
        Self {
            status,
            body,
            location: None,
        }
    }

    /// `200 {"status":"ok"}`.
    pub fn ok() -> Self {
        Self::json(Status::OK, json!({ "status": "ok" }))
    }

    /// `400` with the normalized error map as body.
    pub fn bad_request(errors: &ErrorMap) -> Self {
        Self::json(Status::BAD_REQUEST, error_body(errors))
    }

    /// `403` with the normalized error map as body.
    pub fn forbidden_errors(errors: &ErrorMap) -> Self {
        Self::json(Status::FORBIDDEN, error_body(errors))
    }

    /// `403` for a failed access check.
    pub fn forbidden(profile: &str) -> Self {
        Self::json(
            Status::FORBIDDEN,
            json!({
                "error": "forbidden",
                "message": format!("access forbidden: missing profile '{profile}'"),
            }),
        )
    }

    /// `302` to `location` with an empty JSON body.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: Status::FOUND,
            body: json!({}),
            location: Some(location.into()),
        }
    }
}

fn error_body(errors: &ErrorMap) -> Value {
    serde_json::to_value(normalize_error_map(errors)).unwrap_or(Value::Null)
}
