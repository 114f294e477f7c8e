#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{AuthUser, BridgeToken, OtpDevice, OtpMethod, OutboxEvent, TrustedDevice};
use crate::error::AuthServiceError;

/// Repository for user rows.
pub trait UserRepository: Send + Sync {
    /// Find by email (case-insensitive) or phone number. The caller must not
    /// reveal which field matched.
    async fn find_by_identifier(&self, identifier: &str)
    -> Result<Option<AuthUser>, AuthServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError>;

    async fn touch_last_login(&self, id: Uuid, now: DateTime<Utc>)
    -> Result<(), AuthServiceError>;

    /// Persist the 2FA bookkeeping fields together.
    async fn update_two_factor(
        &self,
        id: Uuid,
        enabled_2fa: bool,
        default_2fa_method: Option<String>,
    ) -> Result<(), AuthServiceError>;
}

/// Repository for bridge tokens. The unique `user_id` column backs the
/// at-most-one-live-token-per-user invariant.
pub trait BridgeTokenRepository: Send + Sync {
    /// Insert `token`, deleting any existing row for the same user in the
    /// same transaction.
    async fn replace_for_user(&self, token: &BridgeToken) -> Result<(), AuthServiceError>;

    async fn find(&self, key: &str) -> Result<Option<BridgeToken>, AuthServiceError>;

    async fn delete(&self, key: &str) -> Result<(), AuthServiceError>;
}

/// Ledger of (user, user-agent, ip) triples seen at login.
pub trait TrustedDeviceRepository: Send + Sync {
    /// Atomic get-or-create on the composite key. Returns the row and
    /// whether it was newly created; existing rows get `last_seen` bumped.
    async fn record_login(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(TrustedDevice, bool), AuthServiceError>;

    /// Exact-match existence check with `trusted = true`.
    async fn is_trusted(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<bool, AuthServiceError>;

    /// Most recently seen untrusted device id for the triple, if any. Feeds
    /// `user_device_id` in token responses so clients can offer "trust this
    /// device".
    async fn latest_untrusted_id(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<Option<Uuid>, AuthServiceError>;
}

/// Repository for second-factor devices.
pub trait OtpDeviceRepository: Send + Sync {
    /// Find a user's device for a method by id.
    async fn find(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        device_id: Uuid,
    ) -> Result<Option<OtpDevice>, AuthServiceError>;

    /// Find a user's device for a method (at most one exists).
    async fn find_for_user(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<Option<OtpDevice>, AuthServiceError>;

    /// Get the user's device for a method, creating an unconfirmed one with
    /// the given method-specific state if absent.
    async fn get_or_create(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        secret: Option<&str>,
        number: Option<&str>,
    ) -> Result<OtpDevice, AuthServiceError>;

    async fn set_confirmed(&self, device_id: Uuid, confirmed: bool)
    -> Result<(), AuthServiceError>;

    /// Store a freshly generated challenge code and enqueue its delivery
    /// event in the same transaction.
    async fn store_challenge(
        &self,
        device_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError>;

    /// Delete the user's device for a method. Returns `true` if a row was
    /// deleted.
    async fn delete_for_method(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<bool, AuthServiceError>;

    /// Whether any confirmed device remains for the user, over all methods.
    async fn any_confirmed(&self, user_id: Uuid) -> Result<bool, AuthServiceError>;
}

/// Standalone outbox writer, for events not tied to a challenge transaction
/// (e.g. new-device notifications).
pub trait OutboxRepository: Send + Sync {
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), AuthServiceError>;
}

/// Login-attempt rate limiter keyed by client identity.
pub trait RateLimiter: Send + Sync {
    /// Count one attempt for `key`. Returns `false` once the attempt is over
    /// the configured threshold for the current window.
    async fn check(&self, key: &str) -> Result<bool, AuthServiceError>;
}
