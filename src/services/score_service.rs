//! Score aggregation and result resolution.
//!
//! Each side submits its final score into its own column of the match
//! record; the submission is idempotent per seat, so a retry overwrites
//! rather than duplicating. Resolution is folded into the read path: the
//! first poll that observes both scores while the match is still running
//! computes the winner and issues the idempotent finish write. Both clients
//! racing that write is harmless — the loser matches zero records.

use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        MatchEntity, MatchGuard, MatchPatch, MatchStatus, ParticipantResultEntity,
        ParticipantRole, Patch,
    },
    dto::score::{MatchResultDto, ScoreBoard, ScoreSubmission, Winner},
    error::ServiceError,
    state::SharedState,
};

/// Record one seat's final score and stats.
pub async fn submit_score(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
    submission: ScoreSubmission,
) -> Result<ScoreBoard, ServiceError> {
    submission.validate()?;
    let store = state.require_match_store().await?;

    let Some(record) = store.find_match(id).await? else {
        return Err(ServiceError::NotFound(format!("lobby `{id}` not found")));
    };

    let role = submission.role;
    ensure_seat(&record, caller, role)?;

    let result: ParticipantResultEntity = submission.into();
    // The guard pins the caller to the seat but deliberately not the status:
    // a late resubmission after the match resolved still overwrites in place.
    let (guard, patch) = match role {
        ParticipantRole::Host => (
            MatchGuard {
                host_id: Some(caller),
                ..Default::default()
            },
            MatchPatch {
                host_result: Patch::Set(Some(result)),
                ..Default::default()
            },
        ),
        ParticipantRole::Joined => (
            MatchGuard {
                joined_id: Some(caller),
                ..Default::default()
            },
            MatchPatch {
                joined_result: Patch::Set(Some(result)),
                ..Default::default()
            },
        ),
    };

    if !store.update_match(id, guard, patch).await? {
        return Err(ServiceError::InvalidState(
            "the match changed while recording the score".into(),
        ));
    }

    read_scores(state, caller, id).await
}

/// Read the aggregated scores, resolving the outcome once both are in.
pub async fn read_scores(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<ScoreBoard, ServiceError> {
    let store = state.require_match_store().await?;

    let Some(mut record) = store.find_match(id).await? else {
        return Err(ServiceError::NotFound(format!("lobby `{id}` not found")));
    };

    if record.host_id != caller && record.joined_id != Some(caller) {
        return Err(ServiceError::Forbidden(
            "caller is not a participant of this match".into(),
        ));
    }

    let both_submitted = record.host_result.is_some() && record.joined_result.is_some();

    if both_submitted && record.status == MatchStatus::InProgress {
        let guard = MatchGuard {
            status: Some(MatchStatus::InProgress),
            ..Default::default()
        };
        let patch = MatchPatch {
            status: Patch::Set(MatchStatus::Finished),
            ..Default::default()
        };
        if store.update_match(id, guard, patch).await? {
            debug!(%id, "match resolved");
        }
        // Whoever won the race, the record is finished now.
        record.status = MatchStatus::Finished;
    }

    let result = if both_submitted {
        Some(resolve_result(state, &record).await)
    } else {
        None
    };

    Ok(ScoreBoard {
        host_score: record.host_result.map(|r| r.score),
        joined_score: record.joined_result.map(|r| r.score),
        both_submitted,
        result,
    })
}

async fn resolve_result(state: &SharedState, record: &MatchEntity) -> MatchResultDto {
    let host_score = record.host_result.as_ref().map_or(0, |r| r.score);
    let joined_score = record.joined_result.as_ref().map_or(0, |r| r.score);
    let winner = match host_score.cmp(&joined_score) {
        std::cmp::Ordering::Greater => Winner::Host,
        std::cmp::Ordering::Less => Winner::Joined,
        std::cmp::Ordering::Equal => Winner::Tie,
    };

    let host_name = lookup_name(state, record.host_id).await;
    let joined_name = match record.joined_id {
        Some(joined) => lookup_name(state, joined).await,
        None => None,
    };

    MatchResultDto {
        winner,
        host_name,
        joined_name,
    }
}

async fn lookup_name(state: &SharedState, participant: Uuid) -> Option<String> {
    match state.identity().display_name(participant).await {
        Ok(name) => name,
        Err(err) => {
            warn!(%participant, error = %err, "display name lookup failed during resolution");
            None
        }
    }
}

fn ensure_seat(
    record: &MatchEntity,
    caller: Uuid,
    role: ParticipantRole,
) -> Result<(), ServiceError> {
    let holds_seat = match role {
        ParticipantRole::Host => record.host_id == caller,
        ParticipantRole::Joined => record.joined_id == Some(caller),
    };
    if !holds_seat {
        return Err(ServiceError::Forbidden(
            "score role does not match the caller's seat".into(),
        ));
    }
    Ok(())
}
