use std::net::SocketAddr;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, header};
use serde::de::DeserializeOwned;

use opsgate_auth_types::bearer::BearerCredential;

use crate::domain::types::AuthUser;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::token::CheckTokenUseCase;

pub mod health;
pub mod token;
pub mod twofactor;

/// Client IP for device identity and rate limiting: first entry of
/// `X-Forwarded-For` when the reverse proxy sets it, else the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// User-Agent header value; a missing header counts as the empty string so it
/// still forms a device identity.
pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Resolve an access-token Bearer credential to its user. Bridge tokens are
/// not accepted here.
pub(crate) async fn current_user(
    state: &AppState,
    credential: &BearerCredential,
) -> Result<AuthUser, AuthServiceError> {
    if credential.looks_like_bridge_token() {
        return Err(AuthServiceError::InvalidToken);
    }
    let usecase = CheckTokenUseCase {
        users: state.user_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    Ok(usecase.execute(&credential.0).await?.user)
}

/// JSON request body. An absent, non-JSON, or undecodable body rejects as
/// `MissingParameters` so every body failure shares the `{kind, message}`
/// error shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AuthServiceError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let fut = Json::<T>::from_request(req, state);
        async move {
            let Json(value) = fut
                .await
                .map_err(|_| AuthServiceError::MissingParameters)?;
            Ok(Self(value))
        }
    }
}
