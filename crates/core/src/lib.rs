//! `gatekeep-core` — building blocks shared by the gate and its hosts.
//!
//! This crate contains **no** policy logic and no transport code: identities,
//! validation results and the JSON reply model only.

pub mod error;
pub mod id;
pub mod reply;
pub mod validation;

pub use error::{CoreError, CoreResult};
pub use id::{PrincipalId, SessionId};
pub use reply::{Reply, Status};
pub use validation::{ErrorMap, GLOBAL_KEY, Validation, ValidationError, normalize_error_map, normalize_field};
