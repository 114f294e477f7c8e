//! `Authorization: Bearer` credential extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;

/// Length of opaque bridge-token keys. Signed JWTs are always longer, so the
/// exact length distinguishes the two credential shapes on the wire.
pub const BRIDGE_TOKEN_LEN: usize = 40;

/// Raw Bearer credential taken from the `Authorization` header.
///
/// Returns 401 if the header is absent, has no `Bearer` prefix, is empty, or
/// contains embedded whitespace. Validation of the value (JWT signature,
/// bridge-token lookup) is the handler's job.
#[derive(Debug, Clone)]
pub struct BearerCredential(pub String);

impl BearerCredential {
    /// Whether the value has the fixed shape of a bridge token rather than a
    /// signed JWT.
    pub fn looks_like_bridge_token(&self) -> bool {
        self.0.len() == BRIDGE_TOKEN_LEN && !self.0.contains('.')
    }
}

impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // In Rust 1.82+ precise capturing, `async fn` captures lifetimes differently,
    // causing E0195. Fix: extract values synchronously, return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let value = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty() && !token.contains(char::is_whitespace))
            .map(str::to_owned);

        async move {
            let value = value.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self(value))
        }
    }
}
