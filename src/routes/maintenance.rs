use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{
    dto::common::SweepResponse, error::AppError, services::sweep_service, state::SharedState,
};

const MAINTENANCE_TOKEN_HEADER: &str = "x-maintenance-token";

/// Maintenance endpoints for the cleanup sweeps, protected by a shared
/// secret. The background sweep task makes these optional in single-node
/// deployments; external schedulers use them.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/maintenance/sweeps/expired", post(sweep_expired))
        .route("/maintenance/sweeps/inactive", post(sweep_inactive))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_maintenance_token,
        ))
}

/// Delete waiting lobbies whose TTL has passed.
#[utoipa::path(
    post,
    path = "/maintenance/sweeps/expired",
    tag = "maintenance",
    params(("X-Maintenance-Token" = String, Header, description = "Shared maintenance secret")),
    responses((status = 200, description = "Sweep completed", body = SweepResponse))
)]
pub async fn sweep_expired(
    State(state): State<SharedState>,
) -> Result<Json<SweepResponse>, AppError> {
    let deleted = sweep_service::run_expired_sweep(&state).await?;
    Ok(Json(SweepResponse { deleted }))
}

/// Delete records of any status past the inactivity threshold.
#[utoipa::path(
    post,
    path = "/maintenance/sweeps/inactive",
    tag = "maintenance",
    params(("X-Maintenance-Token" = String, Header, description = "Shared maintenance secret")),
    responses((status = 200, description = "Sweep completed", body = SweepResponse))
)]
pub async fn sweep_inactive(
    State(state): State<SharedState>,
) -> Result<Json<SweepResponse>, AppError> {
    let deleted = sweep_service::run_inactive_sweep(&state).await?;
    Ok(Json(SweepResponse { deleted }))
}

async fn require_maintenance_token(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().maintenance_token() else {
        return Err(AppError::Unauthorized(
            "maintenance token not configured".into(),
        ));
    };

    let presented = request
        .headers()
        .get(MAINTENANCE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if presented != Some(expected) {
        return Err(AppError::Unauthorized("invalid maintenance token".into()));
    }

    Ok(next.run(request).await)
}
