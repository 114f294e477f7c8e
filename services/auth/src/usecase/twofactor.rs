use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use opsgate_core::audit::{AuditLog, AuditRecord};

use crate::domain::registry::OtpRegistry;
use crate::domain::repository::{OtpDeviceRepository, UserRepository};
use crate::domain::types::{AuthUser, OtpMethod};
use crate::error::AuthServiceError;
use crate::usecase::challenge::{
    generate_challenge, generate_totp_secret, provisioning_url, verify_code,
};

// ── Setup (start enrolling a method) ─────────────────────────────────────────

#[derive(Debug)]
pub struct SetupOutput {
    pub message: String,
    pub device_id: Uuid,
    pub method: String,
    /// otpauth:// URL for QR rendering. Only ever set for TOTP.
    pub qr_data: Option<String>,
}

pub struct SetupTwoFactorUseCase<O: OtpDeviceRepository> {
    pub otp_devices: O,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
    pub totp_issuer: String,
}

impl<O: OtpDeviceRepository> SetupTwoFactorUseCase<O> {
    pub async fn execute(
        &self,
        user: &AuthUser,
        method_name: &str,
    ) -> Result<SetupOutput, AuthServiceError> {
        let method = self.registry.get(method_name)?;

        if let Some(existing) = self.otp_devices.find_for_user(user.id, method).await? {
            if existing.confirmed {
                return Err(AuthServiceError::AlreadyEnabled);
            }
        }

        // Re-running setup reuses the unconfirmed device (and its TOTP
        // secret) rather than minting a new one.
        let secret = match method {
            OtpMethod::Totp => Some(generate_totp_secret()),
            _ => None,
        };
        let number = match method {
            OtpMethod::Sms => Some(user.phone.as_str()),
            _ => None,
        };
        let device = self
            .otp_devices
            .get_or_create(user.id, method, secret.as_deref(), number)
            .await?;

        let challenge = generate_challenge(&device, user, Utc::now())?;
        if let Some(stored) = challenge.stored {
            self.otp_devices
                .store_challenge(device.id, &stored.code, stored.expires_at, &stored.event)
                .await?;
        }

        let qr_data = provisioning_url(&device, user, &self.totp_issuer)?;

        self.audit.record(AuditRecord {
            entity: "otp_device",
            entity_id: device.id.to_string(),
            action: "2fa_setup_started",
        });

        Ok(SetupOutput {
            message: challenge.message,
            device_id: device.id,
            method: method_name.to_owned(),
            qr_data,
        })
    }
}

// ── Verify (confirm enrollment) ──────────────────────────────────────────────

pub struct VerifyTwoFactorUseCase<O, U>
where
    O: OtpDeviceRepository,
    U: UserRepository,
{
    pub otp_devices: O,
    pub users: U,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
    pub totp_issuer: String,
}

impl<O, U> VerifyTwoFactorUseCase<O, U>
where
    O: OtpDeviceRepository,
    U: UserRepository,
{
    pub async fn execute(
        &self,
        user: &AuthUser,
        method_name: &str,
        device_id: Uuid,
        code: &str,
    ) -> Result<String, AuthServiceError> {
        let method = self.registry.get(method_name)?;
        let device = self
            .otp_devices
            .find(user.id, method, device_id)
            .await?
            .ok_or(AuthServiceError::DeviceNotFound)?;

        if device.confirmed {
            return Err(AuthServiceError::AlreadyEnabled);
        }
        if !verify_code(&device, code, user, &self.totp_issuer, Utc::now())? {
            return Err(AuthServiceError::InvalidOtp);
        }

        self.otp_devices.set_confirmed(device.id, true).await?;

        // First confirmed method becomes the default; an existing default is
        // kept.
        let default = user
            .default_2fa_method
            .clone()
            .unwrap_or_else(|| method_name.to_owned());
        self.users
            .update_two_factor(user.id, true, Some(default))
            .await?;

        self.audit.record(AuditRecord {
            entity: "user",
            entity_id: user.id.to_string(),
            action: "2fa_enabled",
        });

        Ok(format!("Two-factor method {method_name} is now active."))
    }
}

// ── Resend (fresh code for an unconfirmed device) ────────────────────────────

pub struct ResendTwoFactorUseCase<O: OtpDeviceRepository> {
    pub otp_devices: O,
    pub registry: Arc<OtpRegistry>,
}

impl<O: OtpDeviceRepository> ResendTwoFactorUseCase<O> {
    pub async fn execute(
        &self,
        user: &AuthUser,
        method_name: &str,
        device_id: Uuid,
    ) -> Result<String, AuthServiceError> {
        let method = self.registry.get(method_name)?;
        let device = self
            .otp_devices
            .find(user.id, method, device_id)
            .await?
            .ok_or(AuthServiceError::DeviceNotFound)?;

        if device.confirmed {
            return Err(AuthServiceError::AlreadyEnabled);
        }

        let challenge = generate_challenge(&device, user, Utc::now())?;
        if let Some(stored) = challenge.stored {
            self.otp_devices
                .store_challenge(device.id, &stored.code, stored.expires_at, &stored.event)
                .await?;
        }

        Ok(challenge.message)
    }
}

// ── Disable ──────────────────────────────────────────────────────────────────

pub struct DisableTwoFactorUseCase<O, U>
where
    O: OtpDeviceRepository,
    U: UserRepository,
{
    pub otp_devices: O,
    pub users: U,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
}

impl<O, U> DisableTwoFactorUseCase<O, U>
where
    O: OtpDeviceRepository,
    U: UserRepository,
{
    /// `target` is a registered method name, or `"all"` to tear down every
    /// method at once.
    pub async fn execute(
        &self,
        user: &AuthUser,
        target: &str,
    ) -> Result<String, AuthServiceError> {
        if target == "all" {
            // One audit record for the whole teardown, not one per device.
            let pause = self.audit.suppress();
            for (_, method) in self.registry.methods() {
                self.otp_devices.delete_for_method(user.id, method).await?;
            }
            drop(pause);

            self.users.update_two_factor(user.id, false, None).await?;
            self.audit.record(AuditRecord {
                entity: "user",
                entity_id: user.id.to_string(),
                action: "2fa_disabled",
            });
            return Ok("Two-factor authentication has been disabled.".to_owned());
        }

        let method = self.registry.get(target)?;
        let removed = self.otp_devices.delete_for_method(user.id, method).await?;
        if !removed {
            return Err(AuthServiceError::DeviceNotFound);
        }

        let any_left = self.otp_devices.any_confirmed(user.id).await?;
        let default = if !any_left {
            None
        } else if user.default_2fa_method.as_deref() == Some(target) {
            // The default method is gone; the user must pick a new one.
            None
        } else {
            user.default_2fa_method.clone()
        };
        self.users
            .update_two_factor(user.id, any_left, default)
            .await?;

        self.audit.record(AuditRecord {
            entity: "user",
            entity_id: user.id.to_string(),
            action: "2fa_method_disabled",
        });

        Ok(format!("Two-factor method {target} has been disabled."))
    }
}
