use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Approval, GameMode, MatchEntity, MatchSettingsEntity, MatchStatus},
    dto::format_system_time,
};

/// Quiz settings supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq, Eq)]
pub struct MatchSettingsDto {
    /// Vocabulary category the questions are drawn from.
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    /// Subcategory within the category; 0 mixes all subcategories.
    #[serde(default)]
    pub subcategory: u32,
    /// Number of questions each side plays.
    #[validate(range(min = 1, max = 50))]
    pub num_questions: u32,
    /// Per-question countdown in seconds.
    #[validate(range(min = 3, max = 120))]
    pub timer_secs: u32,
    /// Quiz kind.
    pub mode: GameMode,
}

/// Payload used to open a new lobby.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateLobbyRequest {
    /// Initial quiz settings.
    #[validate(nested)]
    pub settings: MatchSettingsDto,
}

/// Payload used by the host to replace the quiz settings before the start.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateSettingsRequest {
    /// Replacement quiz settings.
    #[validate(nested)]
    pub settings: MatchSettingsDto,
}

/// Full projection of a match record, returned to its participants and
/// re-read by their pollers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LobbySummary {
    /// Match identifier.
    pub id: Uuid,
    /// Shareable join token.
    pub game_code: String,
    /// Lobby creator.
    pub host_id: Uuid,
    /// Second participant, if present.
    pub joined_id: Option<Uuid>,
    /// Current quiz settings.
    pub settings: MatchSettingsDto,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Host decision about the joined participant.
    pub approval: Approval,
    /// Joined participant's readiness flag.
    pub ready: bool,
    /// Host's submitted score, once available.
    pub host_score: Option<i64>,
    /// Joined participant's submitted score, once available.
    pub joined_score: Option<i64>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Waiting-period deadline (RFC 3339).
    pub expires_at: String,
    /// Start timestamp, if the match started (RFC 3339).
    pub started_at: Option<String>,
    /// Last mutation timestamp (RFC 3339).
    pub updated_at: String,
}

/// Public-safe summary shown to anyone holding a game code, before joining.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LobbyPreview {
    /// Shareable join token.
    pub game_code: String,
    /// Host display name, when the identity collaborator knows it.
    pub host_name: Option<String>,
    /// Quiz settings the host configured.
    pub settings: MatchSettingsDto,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Waiting-period deadline (RFC 3339).
    pub expires_at: String,
}

impl From<MatchSettingsEntity> for MatchSettingsDto {
    fn from(value: MatchSettingsEntity) -> Self {
        Self {
            category: value.category,
            subcategory: value.subcategory,
            num_questions: value.num_questions,
            timer_secs: value.timer_secs,
            mode: value.mode,
        }
    }
}

impl From<MatchSettingsDto> for MatchSettingsEntity {
    fn from(value: MatchSettingsDto) -> Self {
        Self {
            category: value.category,
            subcategory: value.subcategory,
            num_questions: value.num_questions,
            timer_secs: value.timer_secs,
            mode: value.mode,
        }
    }
}

impl From<MatchEntity> for LobbySummary {
    fn from(record: MatchEntity) -> Self {
        Self {
            id: record.id,
            game_code: record.game_code,
            host_id: record.host_id,
            joined_id: record.joined_id,
            settings: record.settings.into(),
            status: record.status,
            approval: record.approval,
            ready: record.ready,
            host_score: record.host_result.map(|result| result.score),
            joined_score: record.joined_result.map(|result| result.score),
            created_at: format_system_time(record.created_at),
            expires_at: format_system_time(record.expires_at),
            started_at: record.started_at.map(format_system_time),
            updated_at: format_system_time(record.updated_at),
        }
    }
}
