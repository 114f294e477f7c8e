//! Shared plumbing for Opsgate services.
//!
//! Provides health endpoints, request-id middleware, tracing init, and the
//! audit sink with its scoped suppression guard.

pub mod audit;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
