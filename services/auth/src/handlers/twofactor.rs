use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsgate_auth_types::bearer::BearerCredential;

use crate::error::AuthServiceError;
use crate::handlers::{JsonBody, current_user};
use crate::state::AppState;
use crate::usecase::twofactor::{
    DisableTwoFactorUseCase, ResendTwoFactorUseCase, SetupTwoFactorUseCase, VerifyTwoFactorUseCase,
};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ── POST /auth/2fa/activate ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ActivateRequest {
    #[serde(rename = "type")]
    pub method: Option<String>,
}

#[derive(Serialize)]
pub struct ActivateResponse {
    pub message: String,
    pub device_id: Uuid,
    pub method: String,
    /// otpauth:// URL for QR rendering, TOTP only.
    pub qr_data: Option<String>,
}

pub async fn activate_two_factor(
    State(state): State<AppState>,
    credential: BearerCredential,
    JsonBody(body): JsonBody<ActivateRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let user = current_user(&state, &credential).await?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = SetupTwoFactorUseCase {
        otp_devices: state.otp_device_repo(),
        registry: state.registry.clone(),
        audit: state.audit.clone(),
        totp_issuer: state.totp_issuer.clone(),
    };
    let out = usecase.execute(&user, &method).await?;

    Ok((
        StatusCode::OK,
        Json(ActivateResponse {
            message: out.message,
            device_id: out.device_id,
            method: out.method,
            qr_data: out.qr_data,
        }),
    ))
}

// ── POST /auth/2fa/verify ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub device_id: Option<Uuid>,
    /// The submitted OTP code.
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub method: Option<String>,
}

pub async fn verify_two_factor(
    State(state): State<AppState>,
    credential: BearerCredential,
    JsonBody(body): JsonBody<VerifyRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let user = current_user(&state, &credential).await?;
    let device_id = body.device_id.ok_or(AuthServiceError::MissingParameters)?;
    let code = body.token.ok_or(AuthServiceError::MissingParameters)?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = VerifyTwoFactorUseCase {
        otp_devices: state.otp_device_repo(),
        users: state.user_repo(),
        registry: state.registry.clone(),
        audit: state.audit.clone(),
        totp_issuer: state.totp_issuer.clone(),
    };
    let message = usecase.execute(&user, &method, device_id, &code).await?;

    Ok((StatusCode::OK, Json(MessageResponse { message })))
}

// ── POST /auth/2fa/resend ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResendRequest {
    #[serde(rename = "type")]
    pub method: Option<String>,
    pub device_id: Option<Uuid>,
}

pub async fn resend_two_factor(
    State(state): State<AppState>,
    credential: BearerCredential,
    JsonBody(body): JsonBody<ResendRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let user = current_user(&state, &credential).await?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;
    let device_id = body.device_id.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = ResendTwoFactorUseCase {
        otp_devices: state.otp_device_repo(),
        registry: state.registry.clone(),
    };
    let message = usecase.execute(&user, &method, device_id).await?;

    Ok((StatusCode::OK, Json(MessageResponse { message })))
}

// ── POST /auth/2fa/disable ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DisableRequest {
    /// A registered method name, or "all".
    #[serde(rename = "type")]
    pub method: Option<String>,
}

pub async fn disable_two_factor(
    State(state): State<AppState>,
    credential: BearerCredential,
    JsonBody(body): JsonBody<DisableRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let user = current_user(&state, &credential).await?;
    let method = body.method.ok_or(AuthServiceError::MissingParameters)?;

    let usecase = DisableTwoFactorUseCase {
        otp_devices: state.otp_device_repo(),
        users: state.user_repo(),
        registry: state.registry.clone(),
        audit: state.audit.clone(),
    };
    let message = usecase.execute(&user, &method).await?;

    Ok((StatusCode::OK, Json(MessageResponse { message })))
}
