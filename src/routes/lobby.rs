use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        common::ActionResponse,
        lobby::{CreateLobbyRequest, LobbyPreview, LobbySummary, UpdateSettingsRequest},
    },
    error::AppError,
    routes::participant::CallerIdentity,
    services::lobby_service,
    state::SharedState,
};

/// Routes driving the lobby state machine.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lobbies", post(create_lobby))
        .route("/lobbies/code/{code}", get(preview_lobby))
        .route("/lobbies/code/{code}/join", post(join_lobby))
        .route("/lobbies/{id}", get(get_lobby))
        .route("/lobbies/{id}/settings", patch(update_settings))
        .route("/lobbies/{id}/accept", post(accept_opponent))
        .route("/lobbies/{id}/reject", post(reject_opponent))
        .route("/lobbies/{id}/kick", post(kick_opponent))
        .route("/lobbies/{id}/ready", post(declare_ready))
        .route("/lobbies/{id}/leave", post(leave_lobby))
        .route("/lobbies/{id}/start", post(start_match))
        .route("/lobbies/{id}/reset", post(reset_match))
}

/// Open a new lobby and receive its shareable game code.
#[utoipa::path(
    post,
    path = "/lobbies",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity")),
    request_body = CreateLobbyRequest,
    responses((status = 200, description = "Lobby created", body = LobbySummary))
)]
pub async fn create_lobby(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Json(payload): Json<CreateLobbyRequest>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::create_lobby(&state, caller, payload).await?,
    ))
}

/// Public-safe summary for anyone holding a game code.
#[utoipa::path(
    get,
    path = "/lobbies/code/{code}",
    tag = "lobby",
    params(("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Lobby preview", body = LobbyPreview),
        (status = 404, description = "No lobby with this code"),
        (status = 409, description = "Lobby closed or full"),
        (status = 410, description = "Code expired")
    )
)]
pub async fn preview_lobby(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<LobbyPreview>, AppError> {
    Ok(Json(lobby_service::preview_lobby(&state, code).await?))
}

/// Join a waiting lobby via its game code.
#[utoipa::path(
    post,
    path = "/lobbies/code/{code}/join",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Seat taken", body = LobbySummary),
        (status = 409, description = "Lobby not waiting or already full")
    )
)]
pub async fn join_lobby(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(code): Path<String>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(lobby_service::join_lobby(&state, caller, code).await?))
}

/// Full record read for a participant; pollers hit this on their cadence.
#[utoipa::path(
    get,
    path = "/lobbies/{id}",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Current lobby state", body = LobbySummary),
        (status = 403, description = "Caller is not a participant")
    )
)]
pub async fn get_lobby(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(lobby_service::get_lobby(&state, caller, id).await?))
}

/// Replace the quiz settings before the match starts (host only).
#[utoipa::path(
    patch,
    path = "/lobbies/{id}/settings",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    request_body = UpdateSettingsRequest,
    responses((status = 200, description = "Settings replaced", body = LobbySummary))
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::update_settings(&state, caller, id, payload).await?,
    ))
}

/// Accept the joined participant (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/accept",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Opponent accepted", body = LobbySummary))
)]
pub async fn accept_opponent(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::accept_opponent(&state, caller, id).await?,
    ))
}

/// Reject the joined participant (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/reject",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Opponent rejected", body = LobbySummary))
)]
pub async fn reject_opponent(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::reject_opponent(&state, caller, id).await?,
    ))
}

/// Remove the joined participant (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/kick",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Opponent removed", body = LobbySummary))
)]
pub async fn kick_opponent(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::kick_opponent(&state, caller, id).await?,
    ))
}

/// Declare readiness (joined participant only).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/ready",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Readiness recorded", body = LobbySummary))
)]
pub async fn declare_ready(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(
        lobby_service::declare_ready(&state, caller, id).await?,
    ))
}

/// Leave the lobby; a leaving host destroys it, a leaving joined participant
/// frees their seat.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/leave",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Left the lobby", body = ActionResponse))
)]
pub async fn leave_lobby(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    lobby_service::leave_lobby(&state, caller, id).await?;
    Ok(Json(ActionResponse::ok()))
}

/// Start the match (host only; requires acceptance and readiness).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/start",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Match started", body = LobbySummary),
        (status = 409, description = "Preconditions unmet")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(lobby_service::start_match(&state, caller, id).await?))
}

/// Rewind the match for a rematch, keeping code and settings (host only).
#[utoipa::path(
    post,
    path = "/lobbies/{id}/reset",
    tag = "lobby",
    params(("X-Participant-Id" = String, Header, description = "Caller identity"),
    ("id" = String, Path, description = "Lobby identifier")),
    responses((status = 200, description = "Match rewound", body = LobbySummary))
)]
pub async fn reset_match(
    State(state): State<SharedState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbySummary>, AppError> {
    Ok(Json(lobby_service::reset_match(&state, caller, id).await?))
}
