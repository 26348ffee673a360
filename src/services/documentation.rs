use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Word Clash Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::create_lobby,
        crate::routes::lobby::preview_lobby,
        crate::routes::lobby::join_lobby,
        crate::routes::lobby::get_lobby,
        crate::routes::lobby::update_settings,
        crate::routes::lobby::accept_opponent,
        crate::routes::lobby::reject_opponent,
        crate::routes::lobby::kick_opponent,
        crate::routes::lobby::declare_ready,
        crate::routes::lobby::leave_lobby,
        crate::routes::lobby::start_match,
        crate::routes::lobby::reset_match,
        crate::routes::score::submit_score,
        crate::routes::score::read_scores,
        crate::routes::maintenance::sweep_expired,
        crate::routes::maintenance::sweep_inactive,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::ActionResponse,
            crate::dto::common::SweepResponse,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::UpdateSettingsRequest,
            crate::dto::lobby::MatchSettingsDto,
            crate::dto::lobby::LobbySummary,
            crate::dto::lobby::LobbyPreview,
            crate::dto::score::ScoreSubmission,
            crate::dto::score::StatsDto,
            crate::dto::score::ScoreBoard,
            crate::dto::score::MatchResultDto,
            crate::dto::score::Winner,
            crate::dao::models::MatchStatus,
            crate::dao::models::Approval,
            crate::dao::models::GameMode,
            crate::dao::models::ParticipantRole,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "Lobby lifecycle operations"),
        (name = "score", description = "Score aggregation and result resolution"),
        (name = "maintenance", description = "Cleanup sweeps for stale lobbies"),
    )
)]
pub struct ApiDoc;
