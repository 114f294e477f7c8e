use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use opsgate_core::audit::AuditLog;

use crate::domain::registry::OtpRegistry;
use crate::infra::cache::RedisRateLimiter;
use crate::infra::db::{
    DbBridgeTokenRepository, DbOtpDeviceRepository, DbOutboxRepository, DbTrustedDeviceRepository,
    DbUserRepository,
};

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub jwt_secret: String,
    pub registry: Arc<OtpRegistry>,
    pub audit: AuditLog,
    pub totp_issuer: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub bridge_ttl_secs: i64,
    pub login_rate_limit: u64,
    pub login_rate_window_secs: u64,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn bridge_token_repo(&self) -> DbBridgeTokenRepository {
        DbBridgeTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn trusted_device_repo(&self) -> DbTrustedDeviceRepository {
        DbTrustedDeviceRepository {
            db: self.db.clone(),
        }
    }

    pub fn otp_device_repo(&self) -> DbOtpDeviceRepository {
        DbOtpDeviceRepository {
            db: self.db.clone(),
        }
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn rate_limiter(&self) -> RedisRateLimiter {
        RedisRateLimiter {
            pool: self.redis.clone(),
            limit: self.login_rate_limit,
            window_secs: self.login_rate_window_secs,
        }
    }
}
