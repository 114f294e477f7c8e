use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User data the auth flows operate on.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub enabled_2fa: bool,
    pub default_2fa_method: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Second-factor method. A closed set of tagged variants — adding a method is
/// a new variant plus a registry entry, nothing inherits from anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OtpMethod {
    Email,
    Sms,
    Totp,
}

impl OtpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Totp => "totp",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "totp" => Some(Self::Totp),
            _ => None,
        }
    }

    /// Outbox event kind for this method's delivery channel. TOTP has no
    /// delivery channel — codes come from the client's clock.
    pub fn outbox_kind(self) -> Option<&'static str> {
        match self {
            Self::Email => Some("otp_email"),
            Self::Sms => Some("otp_sms"),
            Self::Totp => None,
        }
    }
}

impl std::fmt::Display for OtpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token bridging first-factor success to second-factor submission.
#[derive(Debug, Clone)]
pub struct BridgeToken {
    pub key: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BridgeToken {
    /// Boundary is exclusive: a token whose `expires_at` equals `now` is
    /// already expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A (user, user-agent, ip) triple seen at login.
#[derive(Debug, Clone)]
pub struct TrustedDevice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_agent: String,
    pub ip_address: String,
    pub last_seen: DateTime<Utc>,
    pub trusted: bool,
}

/// Second-factor device state, one per (user, method).
#[derive(Debug, Clone)]
pub struct OtpDevice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method: OtpMethod,
    pub confirmed: bool,
    /// TOTP shared secret (base32), set at device creation for TOTP only.
    pub secret: Option<String>,
    /// SMS target number, set at device creation for SMS only.
    pub number: Option<String>,
    /// Most recently issued email/SMS challenge code.
    pub code: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outbox event for async delivery (OTP codes, new-device notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Bridge token length in characters. One definition, shared with the Bearer
/// extractor that classifies credentials by length.
pub use opsgate_auth_types::bearer::BRIDGE_TOKEN_LEN;

/// Bridge token time-to-live in seconds (5 minutes).
pub const BRIDGE_TOKEN_TTL_SECS: i64 = 300;

/// Emailed/texted OTP code length in digits.
pub const OTP_CODE_LEN: usize = 6;

/// Emailed/texted OTP code time-to-live in seconds (10 minutes).
pub const OTP_CODE_TTL_SECS: i64 = 600;

/// Access-token JWT lifetime in seconds (3 hours).
pub const ACCESS_TOKEN_TTL_SECS: u64 = 10800;

/// Refresh-token JWT lifetime in seconds (1 day).
pub const REFRESH_TOKEN_TTL_SECS: u64 = 86400;
