//! Auth types shared across Opsgate services.
//!
//! Provides JWT validation and the `Bearer` credential extractor. Bearer
//! values are either signed JWTs (access/refresh) or 40-character opaque
//! bridge tokens; [`bearer::BearerCredential`] tells the two apart by length.

pub mod bearer;
pub mod token;
