/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// HMAC secret for signing JWT access and refresh tokens.
    pub jwt_secret: String,
    /// TCP port to listen on (default 3112). Env var: `AUTH_PORT`.
    pub auth_port: u16,
    /// Comma-separated second-factor methods to register (default
    /// "email,sms,totp"). Env var: `OTP_METHODS`.
    pub otp_methods: String,
    /// Issuer name embedded in TOTP provisioning URLs. Env var: `TOTP_ISSUER`.
    pub totp_issuer: String,
    /// Login attempts allowed per client per window (default 9999).
    /// Env var: `LOGIN_RATE_LIMIT`.
    pub login_rate_limit: u64,
    /// Rate-limit window in seconds (default 60). Env var:
    /// `LOGIN_RATE_WINDOW_SECS`.
    pub login_rate_window_secs: u64,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            auth_port: std::env::var("AUTH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3112),
            otp_methods: std::env::var("OTP_METHODS")
                .unwrap_or_else(|_| "email,sms,totp".to_owned()),
            totp_issuer: std::env::var("TOTP_ISSUER").unwrap_or_else(|_| "Opsgate".to_owned()),
            login_rate_limit: std::env::var("LOGIN_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9999),
            login_rate_window_secs: std::env::var("LOGIN_RATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}
