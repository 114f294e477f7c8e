use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsgate_auth_types::bearer::BearerCredential;
use opsgate_core::serde::to_rfc3339_ms_opt;

use crate::domain::types::AuthUser;
use crate::error::AuthServiceError;
use crate::handlers::{JsonBody, client_ip, user_agent};
use crate::state::AppState;
use crate::usecase::login::{
    LoginInput, LoginOutcome, LoginUseCase, OtpLoginInput, OtpLoginUseCase, RequestChallengeInput,
    RequestChallengeUseCase,
};
use crate::usecase::token::{CheckTokenUseCase, RefreshTokenUseCase, TokenBundle};

#[derive(Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<AuthUser> for UserSummary {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone: user.phone,
            last_login: user.last_login,
        }
    }
}

/// Full token payload returned on complete authentication.
#[derive(Serialize)]
pub struct TokenPairResponse {
    pub refresh: String,
    pub access: String,
    pub header_types: &'static str,
    pub refresh_expires: u64,
    pub access_expires: u64,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_device_id: Option<Uuid>,
}

impl From<TokenBundle> for TokenPairResponse {
    fn from(bundle: TokenBundle) -> Self {
        Self {
            refresh: bundle.refresh_token,
            access: bundle.access_token,
            header_types: "Bearer",
            refresh_expires: bundle.refresh_token_exp,
            access_expires: bundle.access_token_exp,
            user: bundle.user.into(),
            user_device_id: bundle.user_device_id,
        }
    }
}

// ── POST /auth/token ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct ChallengeRequiredResponse {
    pub message: String,
    pub default: String,
    pub token: String,
    pub devices: BTreeMap<String, Uuid>,
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, AuthServiceError> {
    let identifier = body
        .email
        .or(body.phone)
        .ok_or(AuthServiceError::MissingParameters)?;
    let password = body.password.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = LoginUseCase {
        users: state.user_repo(),
        trusted_devices: state.trusted_device_repo(),
        bridge_tokens: state.bridge_token_repo(),
        otp_devices: state.otp_device_repo(),
        outbox: state.outbox_repo(),
        limiter: state.rate_limiter(),
        registry: state.registry.clone(),
        audit: state.audit.clone(),
        jwt_secret: state.jwt_secret.clone(),
        access_ttl_secs: state.access_ttl_secs,
        refresh_ttl_secs: state.refresh_ttl_secs,
        bridge_ttl_secs: state.bridge_ttl_secs,
    };

    let outcome = usecase
        .execute(LoginInput {
            identifier,
            password,
            user_agent: user_agent(&headers),
            ip_address: client_ip(&headers, &addr),
        })
        .await?;

    match outcome {
        LoginOutcome::Complete(bundle) => {
            Ok((StatusCode::OK, Json(TokenPairResponse::from(bundle))).into_response())
        }
        LoginOutcome::ChallengeRequired(prompt) => Ok((
            StatusCode::ACCEPTED,
            Json(ChallengeRequiredResponse {
                message: prompt.message,
                default: prompt.default,
                token: prompt.token,
                devices: prompt.devices,
            }),
        )
            .into_response()),
    }
}

// ── GET /auth/token ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CheckTokenResponse {
    pub user_id: Uuid,
    pub email: String,
    pub phone: String,
    pub access_token_exp: u64,
}

pub async fn check_token(
    State(state): State<AppState>,
    credential: BearerCredential,
) -> Result<impl IntoResponse, AuthServiceError> {
    if credential.looks_like_bridge_token() {
        return Err(AuthServiceError::InvalidToken);
    }

    // A valid signature is not enough; the subject row must still exist.
    let usecase = CheckTokenUseCase {
        users: state.user_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let checked = usecase.execute(&credential.0).await?;

    Ok((
        StatusCode::OK,
        Json(CheckTokenResponse {
            user_id: checked.user.id,
            email: checked.user.email,
            phone: checked.user.phone,
            access_token_exp: checked.access_token_exp,
        }),
    ))
}

// ── PATCH /auth/token ─────────────────────────────────────────────────────────

pub async fn refresh_token(
    State(state): State<AppState>,
    credential: BearerCredential,
) -> Result<impl IntoResponse, AuthServiceError> {
    if credential.looks_like_bridge_token() {
        return Err(AuthServiceError::InvalidToken);
    }

    let usecase = RefreshTokenUseCase {
        users: state.user_repo(),
        jwt_secret: state.jwt_secret.clone(),
        access_ttl_secs: state.access_ttl_secs,
    };

    let out = usecase.execute(&credential.0).await?;

    Ok((
        StatusCode::OK,
        Json(TokenPairResponse {
            refresh: out.refresh_token,
            access: out.access_token,
            header_types: "Bearer",
            refresh_expires: out.refresh_token_exp,
            access_expires: out.access_token_exp,
            user: out.user.into(),
            user_device_id: None,
        }),
    ))
}

// ── POST /auth/token/2fa ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OtpLoginRequest {
    pub device_id: Option<Uuid>,
    /// The submitted OTP code.
    pub token: Option<String>,
    /// Method name, e.g. "email".
    #[serde(rename = "type")]
    pub method: Option<String>,
}

pub async fn otp_login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    credential: BearerCredential,
    JsonBody(body): JsonBody<OtpLoginRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    if !credential.looks_like_bridge_token() {
        return Err(AuthServiceError::InvalidToken);
    }
    let device_id = body.device_id.ok_or(AuthServiceError::MissingParameters)?;
    let code = body.token.ok_or(AuthServiceError::MissingParameters)?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = OtpLoginUseCase {
        users: state.user_repo(),
        bridge_tokens: state.bridge_token_repo(),
        otp_devices: state.otp_device_repo(),
        trusted_devices: state.trusted_device_repo(),
        registry: state.registry.clone(),
        audit: state.audit.clone(),
        jwt_secret: state.jwt_secret.clone(),
        access_ttl_secs: state.access_ttl_secs,
        refresh_ttl_secs: state.refresh_ttl_secs,
        totp_issuer: state.totp_issuer.clone(),
    };

    let bundle = usecase
        .execute(OtpLoginInput {
            bridge_key: credential.0,
            method,
            device_id,
            code,
            user_agent: user_agent(&headers),
            ip_address: client_ip(&headers, &addr),
        })
        .await?;

    Ok((StatusCode::OK, Json(TokenPairResponse::from(bundle))))
}

// ── POST /auth/token/2fa/challenge ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub device_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub method: Option<String>,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub message: String,
    pub device_id: Uuid,
    #[serde(rename = "type")]
    pub method: String,
}

pub async fn request_challenge(
    State(state): State<AppState>,
    credential: BearerCredential,
    JsonBody(body): JsonBody<ChallengeRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    if !credential.looks_like_bridge_token() {
        return Err(AuthServiceError::InvalidToken);
    }
    let device_id = body.device_id.ok_or(AuthServiceError::MissingParameters)?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = RequestChallengeUseCase {
        users: state.user_repo(),
        bridge_tokens: state.bridge_token_repo(),
        otp_devices: state.otp_device_repo(),
        registry: state.registry.clone(),
    };

    let out = usecase
        .execute(RequestChallengeInput {
            bridge_key: credential.0,
            method,
            device_id,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ChallengeResponse {
            message: out.message,
            device_id: out.device_id,
            method: out.method,
        }),
    ))
}
