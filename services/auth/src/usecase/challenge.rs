use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use serde_json::json;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use crate::domain::types::{AuthUser, OTP_CODE_TTL_SECS, OtpDevice, OtpMethod, OutboxEvent};
use crate::error::AuthServiceError;

/// Generate a six-digit challenge code, zero-padded.
fn generate_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000u32))
}

/// Generate a fresh base32-encoded TOTP shared secret.
pub fn generate_totp_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn build_totp(secret: &str, issuer: &str, account: &str) -> Result<TOTP, AuthServiceError> {
    let bytes = Secret::Encoded(secret.to_owned())
        .to_bytes()
        .map_err(|e| anyhow::anyhow!("decode totp secret: {e:?}"))?;
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        bytes,
        Some(issuer.to_owned()),
        account.to_owned(),
    )
    .map_err(|e| anyhow::anyhow!("build totp: {e}"))
    .map_err(Into::into)
}

/// A challenge ready to hand to the client. Email and SMS methods carry a
/// stored code plus its delivery event; TOTP has nothing to store or send.
#[derive(Debug)]
pub struct Challenge {
    pub message: String,
    pub stored: Option<StoredChallenge>,
}

#[derive(Debug)]
pub struct StoredChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub event: OutboxEvent,
}

/// Generate a challenge for a device. Regenerating always replaces the
/// previous code; only the latest one verifies.
pub fn generate_challenge(
    device: &OtpDevice,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> Result<Challenge, AuthServiceError> {
    match device.method {
        OtpMethod::Totp => Ok(Challenge {
            message: "Enter the code from your authenticator app.".to_owned(),
            stored: None,
        }),
        OtpMethod::Email => {
            let code = generate_code();
            let event_id = Uuid::new_v4();
            let event = OutboxEvent {
                id: event_id,
                kind: "otp_email".to_owned(),
                payload: json!({ "email": user.email, "code": code }),
                idempotency_key: format!("otp_email:{event_id}"),
            };
            Ok(Challenge {
                message: "A login code has been sent to your email address.".to_owned(),
                stored: Some(StoredChallenge {
                    code,
                    expires_at: now + Duration::seconds(OTP_CODE_TTL_SECS),
                    event,
                }),
            })
        }
        OtpMethod::Sms => {
            let number = device.number.as_deref().unwrap_or(user.phone.as_str());
            let code = generate_code();
            let event_id = Uuid::new_v4();
            let event = OutboxEvent {
                id: event_id,
                kind: "otp_sms".to_owned(),
                payload: json!({ "number": number, "code": code }),
                idempotency_key: format!("otp_sms:{event_id}"),
            };
            Ok(Challenge {
                message: "A login code has been sent to your phone.".to_owned(),
                stored: Some(StoredChallenge {
                    code,
                    expires_at: now + Duration::seconds(OTP_CODE_TTL_SECS),
                    event,
                }),
            })
        }
    }
}

/// Verify a submitted code against a device.
///
/// Email/SMS compare against the most recently stored code while it is
/// unexpired (boundary inclusive: a code expiring exactly now still passes).
/// TOTP derives the expected code from the shared secret and the clock, with
/// one step of skew either way.
pub fn verify_code(
    device: &OtpDevice,
    code: &str,
    user: &AuthUser,
    totp_issuer: &str,
    now: DateTime<Utc>,
) -> Result<bool, AuthServiceError> {
    match device.method {
        OtpMethod::Totp => {
            let secret = device
                .secret
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("totp device {} has no secret", device.id))?;
            let totp = build_totp(secret, totp_issuer, &user.email)?;
            totp.check_current(code)
                .map_err(|e| anyhow::anyhow!("system clock: {e}").into())
        }
        OtpMethod::Email | OtpMethod::Sms => {
            let matches = device.code.as_deref() == Some(code);
            let live = device.code_expires_at.is_some_and(|exp| exp >= now);
            Ok(matches && live)
        }
    }
}

/// otpauth:// provisioning URL for a TOTP device, for QR rendering on the
/// client. Other methods have nothing to provision.
pub fn provisioning_url(
    device: &OtpDevice,
    user: &AuthUser,
    totp_issuer: &str,
) -> Result<Option<String>, AuthServiceError> {
    match device.method {
        OtpMethod::Totp => {
            let secret = device
                .secret
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("totp device {} has no secret", device.id))?;
            let totp = build_totp(secret, totp_issuer, &user.email)?;
            Ok(Some(totp.get_url()))
        }
        OtpMethod::Email | OtpMethod::Sms => Ok(None),
    }
}
