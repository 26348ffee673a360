use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic acknowledgement returned by actions without a richer payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    /// Outcome marker, always `"ok"` on success.
    pub status: String,
}

impl ActionResponse {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Outcome of a maintenance sweep run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepResponse {
    /// Number of records the sweep deleted.
    pub deleted: u64,
}
