use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use opsgate_core::health::healthz;
use opsgate_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    health::readyz,
    token::{check_token, login, otp_login, refresh_token, request_challenge},
    twofactor::{activate_two_factor, disable_two_factor, resend_two_factor, verify_two_factor},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Token
        .route("/auth/token", post(login))
        .route("/auth/token", get(check_token))
        .route("/auth/token", patch(refresh_token))
        // Second-factor login
        .route("/auth/token/2fa", post(otp_login))
        .route("/auth/token/2fa/challenge", post(request_challenge))
        // Second-factor management
        .route("/auth/2fa/activate", post(activate_two_factor))
        .route("/auth/2fa/verify", post(verify_two_factor))
        .route("/auth/2fa/resend", post(resend_two_factor))
        .route("/auth/2fa/disable", post(disable_two_factor))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
