use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use opsgate_auth::config::AuthConfig;
use opsgate_auth::domain::registry::OtpRegistry;
use opsgate_auth::domain::types::{
    ACCESS_TOKEN_TTL_SECS, BRIDGE_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS,
};
use opsgate_auth::router::build_router;
use opsgate_auth::state::AppState;
use opsgate_core::audit::{AuditLog, TracingAuditSink};

#[tokio::main]
async fn main() {
    opsgate_core::tracing::init_tracing();

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let registry = Arc::new(OtpRegistry::from_config(&config.otp_methods));
    if registry.is_empty() {
        tracing::warn!("no OTP methods configured; second-factor challenges unavailable");
    }

    let state = AppState {
        db,
        redis,
        jwt_secret: config.jwt_secret,
        registry,
        audit: AuditLog::new(Arc::new(TracingAuditSink)),
        totp_issuer: config.totp_issuer,
        access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
        refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS,
        bridge_ttl_secs: BRIDGE_TOKEN_TTL_SECS,
        login_rate_limit: config.login_rate_limit,
        login_rate_window_secs: config.login_rate_window_secs,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
