//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use crate::domain::chat::Controller;

/// `GET /api/healthz`: `200` if the store and pub/sub backends are
/// reachable, else `503`.
pub async fn healthz(State(controller): State<Arc<Controller>>) -> StatusCode {
    match controller.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
