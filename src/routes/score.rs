use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::score::{ScoreBoard, ScoreSubmission},
    error::AppError,
    routes::participant::CallerIdentity,
    services::score_service,
    state::SharedState,
};

/// Routes for score submission and aggregated reads.
pub fn router() -> Router<SharedState> {
    Router::new().route("/lobbies/{id}/score", post(submit_score).get(read_scores))
}

/// Record the caller's final score and stats for their seat.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/score",
    tag = "score",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    request_body = ScoreSubmission,
    responses(
        (status = 200, description = "Score recorded", body = ScoreBoard),
        (status = 403, description = "Role does not match the caller's seat")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScoreSubmission>,
) -> Result<Json<ScoreBoard>, AppError> {
    Ok(Json(
        score_service::submit_score(&state, caller, id, payload).await?,
    ))
}

/// Read both scores; once both are present the outcome is resolved and the
/// match marked finished.
#[utoipa::path(
    get,
    path = "/lobbies/{id}/score",
    tag = "score",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Aggregated scores", body = ScoreBoard))
)]
pub async fn read_scores(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreBoard>, AppError> {
    Ok(Json(score_service::read_scores(&state, caller, id).await?))
}
