use axum::http::StatusCode;

/// Handler for `GET /healthz` — liveness only: the process is up and serving.
///
/// Readiness is service-owned; each service wires its own `/readyz` handler
/// that checks the backing stores it actually depends on.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
