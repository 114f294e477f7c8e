use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use opsgate_auth::domain::repository::{
    BridgeTokenRepository, OtpDeviceRepository, OutboxRepository, RateLimiter,
    TrustedDeviceRepository, UserRepository,
};
use opsgate_auth::domain::types::{
    AuthUser, BRIDGE_TOKEN_LEN, BRIDGE_TOKEN_TTL_SECS, BridgeToken, OtpDevice, OtpMethod,
    OutboxEvent, TrustedDevice,
};
use opsgate_auth::error::AuthServiceError;
use opsgate_auth::usecase::credentials::hash_password;
use opsgate_core::audit::{AuditRecord, AuditSink};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-integration-tests";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_user() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: "user@example.com".to_owned(),
        phone: "+12025550101".to_owned(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        enabled_2fa: false,
        default_2fa_method: None,
        last_login: None,
    }
}

pub fn test_user_with_2fa(default: &str) -> AuthUser {
    let mut user = test_user();
    user.enabled_2fa = true;
    user.default_2fa_method = Some(default.to_owned());
    user
}

pub fn test_bridge_token(user_id: Uuid) -> BridgeToken {
    let now = Utc::now();
    BridgeToken {
        key: "b".repeat(BRIDGE_TOKEN_LEN),
        user_id,
        created_at: now,
        expires_at: now + Duration::seconds(BRIDGE_TOKEN_TTL_SECS),
    }
}

pub fn test_otp_device(user_id: Uuid, method: OtpMethod, confirmed: bool) -> OtpDevice {
    OtpDevice {
        id: Uuid::new_v4(),
        user_id,
        method,
        confirmed,
        secret: None,
        number: None,
        code: None,
        code_expires_at: None,
        created_at: Utc::now(),
    }
}

// ── MockUserRepo ─────────────────────────────────────────────────────────────

pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<AuthUser>>>,
}

impl MockUserRepo {
    pub fn new(users: Vec<AuthUser>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<AuthUser>>> {
        Arc::clone(&self.users)
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        let lowered = identifier.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == lowered || u.phone == identifier)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn touch_last_login(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.last_login = Some(now);
        }
        Ok(())
    }

    async fn update_two_factor(
        &self,
        id: Uuid,
        enabled_2fa: bool,
        default_2fa_method: Option<String>,
    ) -> Result<(), AuthServiceError> {
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.enabled_2fa = enabled_2fa;
            u.default_2fa_method = default_2fa_method;
        }
        Ok(())
    }
}

// ── MockBridgeTokenRepo ──────────────────────────────────────────────────────

pub struct MockBridgeTokenRepo {
    pub tokens: Arc<Mutex<Vec<BridgeToken>>>,
}

impl MockBridgeTokenRepo {
    pub fn new(tokens: Vec<BridgeToken>) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(tokens)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<BridgeToken>>> {
        Arc::clone(&self.tokens)
    }
}

impl BridgeTokenRepository for MockBridgeTokenRepo {
    async fn replace_for_user(&self, token: &BridgeToken) -> Result<(), AuthServiceError> {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.retain(|t| t.user_id != token.user_id);
        tokens.push(token.clone());
        Ok(())
    }

    async fn find(&self, key: &str) -> Result<Option<BridgeToken>, AuthServiceError> {
        Ok(self.tokens.lock().unwrap().iter().find(|t| t.key == key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), AuthServiceError> {
        self.tokens.lock().unwrap().retain(|t| t.key != key);
        Ok(())
    }
}

// ── MockTrustedDeviceRepo ────────────────────────────────────────────────────

pub struct MockTrustedDeviceRepo {
    pub devices: Arc<Mutex<Vec<TrustedDevice>>>,
}

impl MockTrustedDeviceRepo {
    pub fn new(devices: Vec<TrustedDevice>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn trusted(user_id: Uuid, user_agent: &str, ip_address: &str) -> Self {
        Self::new(vec![TrustedDevice {
            id: Uuid::new_v4(),
            user_id,
            user_agent: user_agent.to_owned(),
            ip_address: ip_address.to_owned(),
            last_seen: Utc::now(),
            trusted: true,
        }])
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<TrustedDevice>>> {
        Arc::clone(&self.devices)
    }
}

impl TrustedDeviceRepository for MockTrustedDeviceRepo {
    async fn record_login(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(TrustedDevice, bool), AuthServiceError> {
        let mut devices = self.devices.lock().unwrap();
        if let Some(existing) = devices.iter_mut().find(|d| {
            d.user_id == user_id && d.user_agent == user_agent && d.ip_address == ip_address
        }) {
            existing.last_seen = now;
            return Ok((existing.clone(), false));
        }
        let device = TrustedDevice {
            id: Uuid::new_v4(),
            user_id,
            user_agent: user_agent.to_owned(),
            ip_address: ip_address.to_owned(),
            last_seen: now,
            trusted: false,
        };
        devices.push(device.clone());
        Ok((device, true))
    }

    async fn is_trusted(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<bool, AuthServiceError> {
        Ok(self.devices.lock().unwrap().iter().any(|d| {
            d.user_id == user_id
                && d.user_agent == user_agent
                && d.ip_address == ip_address
                && d.trusted
        }))
    }

    async fn latest_untrusted_id(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<Option<Uuid>, AuthServiceError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| {
                d.user_id == user_id
                    && d.user_agent == user_agent
                    && d.ip_address == ip_address
                    && !d.trusted
            })
            .max_by_key(|d| d.last_seen)
            .map(|d| d.id))
    }
}

// ── MockOtpDeviceRepo ────────────────────────────────────────────────────────

pub struct MockOtpDeviceRepo {
    pub devices: Arc<Mutex<Vec<OtpDevice>>>,
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl MockOtpDeviceRepo {
    pub fn new(devices: Vec<OtpDevice>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
            events: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<OtpDevice>>> {
        Arc::clone(&self.devices)
    }

    pub fn events_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.events)
    }
}

impl OtpDeviceRepository for MockOtpDeviceRepo {
    async fn find(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        device_id: Uuid,
    ) -> Result<Option<OtpDevice>, AuthServiceError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == device_id && d.user_id == user_id && d.method == method)
            .cloned())
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<Option<OtpDevice>, AuthServiceError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.user_id == user_id && d.method == method)
            .cloned())
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        secret: Option<&str>,
        number: Option<&str>,
    ) -> Result<OtpDevice, AuthServiceError> {
        let mut devices = self.devices.lock().unwrap();
        if let Some(existing) = devices
            .iter()
            .find(|d| d.user_id == user_id && d.method == method)
        {
            return Ok(existing.clone());
        }
        let device = OtpDevice {
            id: Uuid::new_v4(),
            user_id,
            method,
            confirmed: false,
            secret: secret.map(str::to_owned),
            number: number.map(str::to_owned),
            code: None,
            code_expires_at: None,
            created_at: Utc::now(),
        };
        devices.push(device.clone());
        Ok(device)
    }

    async fn set_confirmed(
        &self,
        device_id: Uuid,
        confirmed: bool,
    ) -> Result<(), AuthServiceError> {
        if let Some(d) = self
            .devices
            .lock()
            .unwrap()
            .iter_mut()
            .find(|d| d.id == device_id)
        {
            d.confirmed = confirmed;
        }
        Ok(())
    }

    async fn store_challenge(
        &self,
        device_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError> {
        if let Some(d) = self
            .devices
            .lock()
            .unwrap()
            .iter_mut()
            .find(|d| d.id == device_id)
        {
            d.code = Some(code.to_owned());
            d.code_expires_at = Some(expires_at);
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn delete_for_method(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<bool, AuthServiceError> {
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|d| !(d.user_id == user_id && d.method == method));
        Ok(devices.len() < before)
    }

    async fn any_confirmed(&self, user_id: Uuid) -> Result<bool, AuthServiceError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .any(|d| d.user_id == user_id && d.confirmed))
    }
}

// ── MockOutbox ───────────────────────────────────────────────────────────────

pub struct MockOutbox {
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl MockOutbox {
    pub fn empty() -> Self {
        Self {
            events: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.events)
    }
}

impl OutboxRepository for MockOutbox {
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), AuthServiceError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ── MockRateLimiter ──────────────────────────────────────────────────────────

/// Counting fixed-window limiter, no clock: every check counts against the
/// same window.
pub struct MockRateLimiter {
    pub limit: u64,
    pub counts: Mutex<HashMap<String, u64>>,
}

impl MockRateLimiter {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn permissive() -> Self {
        Self::with_limit(u64::MAX)
    }
}

impl RateLimiter for MockRateLimiter {
    async fn check(&self, key: &str) -> Result<bool, AuthServiceError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_owned()).or_insert(0);
        *count += 1;
        Ok(*count <= self.limit)
    }
}

// ── CapturingAuditSink ───────────────────────────────────────────────────────

pub struct CapturingAuditSink {
    pub records: Mutex<Vec<AuditRecord>>,
}

impl CapturingAuditSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(vec![]),
        })
    }

    pub fn actions(&self) -> Vec<&'static str> {
        self.records.lock().unwrap().iter().map(|r| r.action).collect()
    }
}

impl AuditSink for CapturingAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}
