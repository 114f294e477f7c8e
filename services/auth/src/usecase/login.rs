use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngExt;
use serde_json::json;
use uuid::Uuid;

use opsgate_core::audit::{AuditLog, AuditRecord};

use crate::domain::registry::OtpRegistry;
use crate::domain::repository::{
    BridgeTokenRepository, OtpDeviceRepository, OutboxRepository, RateLimiter,
    TrustedDeviceRepository, UserRepository,
};
use crate::domain::types::{AuthUser, BRIDGE_TOKEN_LEN, BridgeToken, OutboxEvent};
use crate::error::AuthServiceError;
use crate::usecase::challenge::{generate_challenge, verify_code};
use crate::usecase::credentials::verify_credentials;
use crate::usecase::token::{IssueTokens, TokenBundle};

/// Charset for bridge token keys (mixed-case alphanumeric).
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn generate_bridge_key() -> String {
    let mut rng = rand::rng();
    (0..BRIDGE_TOKEN_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Resolve a bridge token key to its user, enforcing expiry.
async fn resolve_bridge<B, U>(
    bridge_tokens: &B,
    users: &U,
    key: &str,
) -> Result<AuthUser, AuthServiceError>
where
    B: BridgeTokenRepository,
    U: UserRepository,
{
    let token = bridge_tokens
        .find(key)
        .await?
        .ok_or(AuthServiceError::InvalidToken)?;

    if token.is_expired(Utc::now()) {
        return Err(AuthServiceError::TokenExpired);
    }

    users
        .find_by_id(token.user_id)
        .await?
        .ok_or(AuthServiceError::InvalidToken)
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub identifier: String,
    pub password: String,
    pub user_agent: String,
    pub ip_address: String,
}

/// What the client gets when credentials pass but a second factor is still
/// owed: the bridge token, the method to try first and the confirmed devices
/// to pick from.
#[derive(Debug)]
pub struct ChallengePrompt {
    pub message: String,
    pub default: String,
    pub token: String,
    pub devices: BTreeMap<String, Uuid>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Complete(TokenBundle),
    ChallengeRequired(ChallengePrompt),
}

pub struct LoginUseCase<U, D, B, O, X, R>
where
    U: UserRepository,
    D: TrustedDeviceRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
    X: OutboxRepository,
    R: RateLimiter,
{
    pub users: U,
    pub trusted_devices: D,
    pub bridge_tokens: B,
    pub otp_devices: O,
    pub outbox: X,
    pub limiter: R,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub bridge_ttl_secs: i64,
}

impl<U, D, B, O, X, R> LoginUseCase<U, D, B, O, X, R>
where
    U: UserRepository,
    D: TrustedDeviceRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
    X: OutboxRepository,
    R: RateLimiter,
{
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutcome, AuthServiceError> {
        // 1. Rate limit before touching credentials, keyed by client IP.
        if !self.limiter.check(&input.ip_address).await? {
            return Err(AuthServiceError::RateLimited);
        }

        // 2. Primary credentials. Nothing below runs on failure — in
        //    particular no device row is written for a bad password.
        let user = verify_credentials(&self.users, &input.identifier, &input.password).await?;

        // 3. Record the (user-agent, ip) pair. First sight of a triple bumps
        //    the user's last_login and notifies; known devices only get
        //    last_seen bumped by the ledger.
        let now = Utc::now();
        let (_device, is_new) = self
            .trusted_devices
            .record_login(user.id, &input.user_agent, &input.ip_address, now)
            .await?;
        if is_new {
            self.users.touch_last_login(user.id, now).await?;
            let event_id = Uuid::new_v4();
            self.outbox
                .enqueue(&OutboxEvent {
                    id: event_id,
                    kind: "device_login".to_owned(),
                    payload: json!({
                        "email": user.email,
                        "user_agent": input.user_agent,
                        "ip_address": input.ip_address,
                        "date": opsgate_core::serde::rfc3339_ms(&now),
                    }),
                    idempotency_key: format!("device_login:{event_id}"),
                })
                .await?;
        }

        // 4. Second factor owed only when 2FA is on, a default method is set
        //    and this exact device is not already trusted.
        let trusted = self
            .trusted_devices
            .is_trusted(user.id, &input.user_agent, &input.ip_address)
            .await?;
        let default_method = user.default_2fa_method.clone();
        let needs_challenge = user.enabled_2fa && default_method.is_some() && !trusted;

        if !needs_challenge {
            let user_device_id = self
                .trusted_devices
                .latest_untrusted_id(user.id, &input.user_agent, &input.ip_address)
                .await?;
            self.audit.record(AuditRecord {
                entity: "user",
                entity_id: user.id.to_string(),
                action: "login",
            });
            let issue = IssueTokens {
                jwt_secret: &self.jwt_secret,
                access_ttl_secs: self.access_ttl_secs,
                refresh_ttl_secs: self.refresh_ttl_secs,
            };
            return Ok(LoginOutcome::Complete(issue.execute(user, user_device_id)?));
        }

        // 5. Mint a bridge token, displacing any live one for this user.
        let token = BridgeToken {
            key: generate_bridge_key(),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::seconds(self.bridge_ttl_secs),
        };
        self.bridge_tokens.replace_for_user(&token).await?;

        // 6. Enumerate confirmed devices the client may challenge.
        let mut devices = BTreeMap::new();
        for (name, method) in self.registry.methods() {
            if let Some(device) = self.otp_devices.find_for_user(user.id, method).await? {
                if device.confirmed {
                    devices.insert(name.to_owned(), device.id);
                }
            }
        }

        self.audit.record(AuditRecord {
            entity: "user",
            entity_id: user.id.to_string(),
            action: "login_challenge_issued",
        });

        Ok(LoginOutcome::ChallengeRequired(ChallengePrompt {
            message: "A second factor is required to finish signing in.".to_owned(),
            // needs_challenge guarantees the default is set
            default: default_method.unwrap_or_default(),
            token: token.key,
            devices,
        }))
    }
}

// ── OtpLogin (bridge token + code → JWT pair) ────────────────────────────────

pub struct OtpLoginInput {
    pub bridge_key: String,
    pub method: String,
    pub device_id: Uuid,
    pub code: String,
    pub user_agent: String,
    pub ip_address: String,
}

pub struct OtpLoginUseCase<U, B, O, D>
where
    U: UserRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
    D: TrustedDeviceRepository,
{
    pub users: U,
    pub bridge_tokens: B,
    pub otp_devices: O,
    pub trusted_devices: D,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub totp_issuer: String,
}

impl<U, B, O, D> OtpLoginUseCase<U, B, O, D>
where
    U: UserRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
    D: TrustedDeviceRepository,
{
    pub async fn execute(&self, input: OtpLoginInput) -> Result<TokenBundle, AuthServiceError> {
        let user = resolve_bridge(&self.bridge_tokens, &self.users, &input.bridge_key).await?;

        let method = self.registry.get(&input.method)?;
        let device = self
            .otp_devices
            .find(user.id, method, input.device_id)
            .await?
            .ok_or(AuthServiceError::DeviceNotFound)?;

        if !verify_code(&device, &input.code, &user, &self.totp_issuer, Utc::now())? {
            return Err(AuthServiceError::InvalidOtp);
        }

        // Single use: the bridge token dies the moment it succeeds.
        self.bridge_tokens.delete(&input.bridge_key).await?;

        let user_device_id = self
            .trusted_devices
            .latest_untrusted_id(user.id, &input.user_agent, &input.ip_address)
            .await?;

        self.audit.record(AuditRecord {
            entity: "user",
            entity_id: user.id.to_string(),
            action: "login_2fa",
        });

        let issue = IssueTokens {
            jwt_secret: &self.jwt_secret,
            access_ttl_secs: self.access_ttl_secs,
            refresh_ttl_secs: self.refresh_ttl_secs,
        };
        issue.execute(user, user_device_id)
    }
}

// ── RequestChallenge (bridge token → fresh code) ─────────────────────────────

pub struct RequestChallengeInput {
    pub bridge_key: String,
    pub method: String,
    pub device_id: Uuid,
}

#[derive(Debug)]
pub struct RequestChallengeOutput {
    pub message: String,
    pub device_id: Uuid,
    pub method: String,
}

pub struct RequestChallengeUseCase<U, B, O>
where
    U: UserRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
{
    pub users: U,
    pub bridge_tokens: B,
    pub otp_devices: O,
    pub registry: Arc<OtpRegistry>,
}

impl<U, B, O> RequestChallengeUseCase<U, B, O>
where
    U: UserRepository,
    B: BridgeTokenRepository,
    O: OtpDeviceRepository,
{
    pub async fn execute(
        &self,
        input: RequestChallengeInput,
    ) -> Result<RequestChallengeOutput, AuthServiceError> {
        let user = resolve_bridge(&self.bridge_tokens, &self.users, &input.bridge_key).await?;

        let method = self.registry.get(&input.method)?;
        let device = self
            .otp_devices
            .find(user.id, method, input.device_id)
            .await?
            .ok_or(AuthServiceError::DeviceNotFound)?;

        let challenge = generate_challenge(&device, &user, Utc::now())?;
        if let Some(stored) = challenge.stored {
            self.otp_devices
                .store_challenge(device.id, &stored.code, stored.expires_at, &stored.event)
                .await?;
        }

        Ok(RequestChallengeOutput {
            message: challenge.message,
            device_id: device.id,
            method: input.method,
        })
    }
}
