use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;

use crate::domain::repository::RateLimiter;
use crate::error::AuthServiceError;

/// Fixed-window login rate limiter backed by Redis.
///
/// One counter per key per window: INCR, set the TTL on first hit, compare
/// against the threshold. The counter expires with the window so no cleanup
/// pass is needed.
#[derive(Clone)]
pub struct RedisRateLimiter {
    pub pool: Pool,
    pub limit: u64,
    pub window_secs: u64,
}

fn rate_key(key: &str) -> String {
    format!("login_rate:{key}")
}

impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<bool, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = rate_key(key);

        let count: u64 = conn
            .incr(&key, 1u64)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Internal(e.into()))?;
        if count == 1 {
            let (): () = conn
                .expire(&key, self.window_secs as i64)
                .await
                .map_err(|e: deadpool_redis::redis::RedisError| {
                    AuthServiceError::Internal(e.into())
                })?;
        }

        Ok(count <= self.limit)
    }
}
