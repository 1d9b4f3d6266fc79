//! HTTP host for the gate: axum router, session cookies, request mapping.

pub mod app;
pub mod context;
pub mod middleware;
pub mod session;
