use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{ParticipantResultEntity, ParticipantRole};

/// Per-question stats accompanying a final score.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq, Eq)]
pub struct StatsDto {
    /// Number of questions played.
    pub questions: u32,
    /// Questions answered correctly.
    pub correct: u32,
    /// Questions answered incorrectly or timed out.
    pub wrong: u32,
    /// Fastest answer in milliseconds.
    pub fastest_ms: u64,
    /// Slowest answer in milliseconds.
    pub slowest_ms: u64,
}

/// Final score submission for one seat of the match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ScoreSubmission {
    /// Seat the submission is for; must match the caller's seat.
    pub role: ParticipantRole,
    /// Accumulated score across all questions.
    #[validate(range(min = 0))]
    pub score: i64,
    /// Per-question stats.
    #[validate(nested)]
    pub stats: StatsDto,
}

/// Side of the match that won, if any.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// The host scored higher.
    Host,
    /// The joined participant scored higher.
    Joined,
    /// Equal scores.
    Tie,
}

/// Resolved outcome of a match, available once both scores are in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MatchResultDto {
    /// Winning seat.
    pub winner: Winner,
    /// Host display name, when the identity collaborator knows it.
    pub host_name: Option<String>,
    /// Joined participant display name, when known.
    pub joined_name: Option<String>,
}

/// Aggregated score view for one match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ScoreBoard {
    /// Host's submitted score, if any.
    pub host_score: Option<i64>,
    /// Joined participant's submitted score, if any.
    pub joined_score: Option<i64>,
    /// True once both role scores are non-null.
    pub both_submitted: bool,
    /// Resolved outcome, present iff `both_submitted`.
    pub result: Option<MatchResultDto>,
}

impl From<ScoreSubmission> for ParticipantResultEntity {
    fn from(submission: ScoreSubmission) -> Self {
        Self {
            score: submission.score,
            questions: submission.stats.questions,
            correct: submission.stats.correct,
            wrong: submission.stats.wrong,
            fastest_ms: submission.stats.fastest_ms,
            slowest_ms: submission.stats.slowest_ms,
        }
    }
}
