use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the match store and report the backend's coarse health state.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.match_store().await else {
        warn!("match store unavailable (degraded mode)");
        return HealthResponse::degraded();
    };

    if let Err(err) = store.health_check().await {
        warn!(error = %err, "match store health check failed");
        return HealthResponse::degraded();
    }

    HealthResponse::ok()
}
