use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse health state of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Storage reachable, requests served normally.
    Ok,
    /// Storage unreachable; mutating requests will fail.
    Degraded,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Current health state.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Response indicating the system is fully operational.
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }

    /// Response indicating the system is running without storage.
    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
        }
    }
}
