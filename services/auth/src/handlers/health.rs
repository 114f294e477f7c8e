use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Handler for `GET /readyz` — ready only when both backing stores answer.
///
/// Postgres is checked with a connection ping, Redis with a PING command on a
/// pooled connection. Either failing returns 503 so the load balancer stops
/// routing logins at a service that cannot complete them.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.db.ping().await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    let Ok(mut conn) = state.redis.get().await else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };
    let pong = deadpool_redis::redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await;

    if pong.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
