use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// Every variant renders as a structured 4xx/5xx JSON body; storage failures
/// stay `Internal` and are never downgraded to an authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("unsupported 2fa method")]
    UnsupportedMethod,
    #[error("2fa device not found")]
    DeviceNotFound,
    #[error("invalid otp")]
    InvalidOtp,
    #[error("2fa already enabled")]
    AlreadyEnabled,
    #[error("missing required parameters")]
    MissingParameters,
    #[error("too many login attempts")]
    RateLimited,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UnsupportedMethod => "UNSUPPORTED_METHOD",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::InvalidOtp => "INVALID_OTP",
            Self::AlreadyEnabled => "ALREADY_ENABLED",
            Self::MissingParameters => "MISSING_PARAMETERS",
            Self::RateLimited => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCredentials
            | Self::AuthenticationFailed
            | Self::TokenExpired
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UnsupportedMethod
            | Self::DeviceNotFound
            | Self::InvalidOtp
            | Self::AlreadyEnabled
            | Self::MissingParameters => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Only 500s get logged here; the trace layer covers the rest.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
