//! Pure transition planning for the per-match state machine.
//!
//! A match record lives in storage, not in process memory, so transitions are
//! not applied here: `plan` validates an action against the record's current
//! phase and returns the guard + patch pair for the guarded conditional
//! write. The guard re-states the precondition, so a plan computed from a
//! stale read matches zero records instead of corrupting the row.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{
    Approval, MatchEntity, MatchGuard, MatchPatch, MatchSettingsEntity, MatchStatus, Patch,
};

/// Effective phase of a match record, including the pre-game sub-state used
/// for gating host and joined-participant actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    /// Open, no second participant yet.
    Waiting,
    /// A second participant is present; approval/readiness being settled.
    OpponentJoined {
        /// Host decision so far.
        approval: Approval,
        /// Joined participant's readiness flag.
        ready: bool,
    },
    /// Both sides are playing.
    InProgress,
    /// Outcome resolved.
    Finished,
}

impl LobbyPhase {
    /// Derive the phase from a record.
    pub fn of(record: &MatchEntity) -> Self {
        match record.status {
            MatchStatus::Waiting => LobbyPhase::Waiting,
            MatchStatus::OpponentJoined => LobbyPhase::OpponentJoined {
                approval: record.approval,
                ready: record.ready,
            },
            MatchStatus::InProgress => LobbyPhase::InProgress,
            MatchStatus::Finished => LobbyPhase::Finished,
        }
    }
}

/// Actions that can be applied to a match record.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyAction {
    /// A second participant joins via the game code.
    Join {
        /// The joining participant.
        participant: Uuid,
        /// Observation instant, used for the expiry guard.
        now: SystemTime,
    },
    /// Host accepts the joined participant.
    Accept,
    /// Host rejects the joined participant.
    Reject,
    /// Host removes the joined participant.
    Kick,
    /// Joined participant declares readiness.
    Ready {
        /// The declaring participant; guards against a kick-and-rejoin race.
        participant: Uuid,
    },
    /// Joined participant leaves voluntarily.
    LeaveJoined {
        /// The leaving participant.
        participant: Uuid,
    },
    /// Host starts the match.
    Start {
        /// Start instant recorded on the record.
        at: SystemTime,
    },
    /// Host rewinds an in-progress or finished match for a rematch.
    Reset,
    /// Host replaces the quiz settings before the match starts.
    UpdateSettings(MatchSettingsEntity),
}

/// Guard + patch pair for one guarded conditional write.
#[derive(Debug, Clone)]
pub struct WritePlan {
    /// Precondition the write re-checks atomically.
    pub guard: MatchGuard,
    /// Fields the write replaces.
    pub patch: MatchPatch,
}

/// Error returned when an action cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {action:?} cannot be applied while in {phase:?}")]
pub struct InvalidTransition {
    /// Phase the record was in when the action was planned.
    pub phase: LobbyPhase,
    /// The action that cannot be applied from this phase.
    pub action: LobbyAction,
}

/// One atomic patch returning a lobby to the no-opponent baseline.
///
/// Reject, kick, and a voluntary leave all funnel through this so every exit
/// path restores the same four fields in a single write.
fn clear_joined_patch() -> MatchPatch {
    MatchPatch {
        status: Patch::Set(MatchStatus::Waiting),
        approval: Patch::Set(Approval::Pending),
        ready: Patch::Set(false),
        joined_id: Patch::Set(None),
        ..Default::default()
    }
}

/// Validate `action` against the record's phase and compute the guarded
/// write that applies it.
pub fn plan(record: &MatchEntity, action: LobbyAction) -> Result<WritePlan, InvalidTransition> {
    let phase = LobbyPhase::of(record);
    let plan = match (phase, action) {
        (LobbyPhase::Waiting, LobbyAction::Join { participant, now }) => WritePlan {
            guard: MatchGuard {
                status: Some(MatchStatus::Waiting),
                joined_present: Some(false),
                not_expired_at: Some(now),
                ..Default::default()
            },
            patch: MatchPatch {
                status: Patch::Set(MatchStatus::OpponentJoined),
                approval: Patch::Set(Approval::Pending),
                ready: Patch::Set(false),
                joined_id: Patch::Set(Some(participant)),
                ..Default::default()
            },
        },
        (
            LobbyPhase::OpponentJoined {
                approval: Approval::Pending,
                ..
            },
            LobbyAction::Accept,
        ) => WritePlan {
            guard: MatchGuard {
                status: Some(MatchStatus::OpponentJoined),
                approval: Some(Approval::Pending),
                joined_present: Some(true),
                ..Default::default()
            },
            patch: MatchPatch {
                approval: Patch::Set(Approval::Accepted),
                ..Default::default()
            },
        },
        (LobbyPhase::OpponentJoined { .. }, LobbyAction::Reject)
        | (LobbyPhase::OpponentJoined { .. }, LobbyAction::Kick) => WritePlan {
            guard: MatchGuard {
                status: Some(MatchStatus::OpponentJoined),
                joined_present: Some(true),
                ..Default::default()
            },
            patch: clear_joined_patch(),
        },
        (
            LobbyPhase::OpponentJoined {
                approval: Approval::Accepted,
                ..
            },
            LobbyAction::Ready { participant },
        ) => WritePlan {
            guard: MatchGuard {
                status: Some(MatchStatus::OpponentJoined),
                approval: Some(Approval::Accepted),
                joined_id: Some(participant),
                ..Default::default()
            },
            patch: MatchPatch {
                ready: Patch::Set(true),
                ..Default::default()
            },
        },
        (LobbyPhase::OpponentJoined { .. }, LobbyAction::LeaveJoined { participant }) => {
            WritePlan {
                guard: MatchGuard {
                    status: Some(MatchStatus::OpponentJoined),
                    joined_id: Some(participant),
                    ..Default::default()
                },
                patch: clear_joined_patch(),
            }
        }
        (
            LobbyPhase::OpponentJoined {
                approval: Approval::Accepted,
                ready: true,
            },
            LobbyAction::Start { at },
        ) => WritePlan {
            guard: MatchGuard {
                status: Some(MatchStatus::OpponentJoined),
                approval: Some(Approval::Accepted),
                ready: Some(true),
                ..Default::default()
            },
            patch: MatchPatch {
                status: Patch::Set(MatchStatus::InProgress),
                started_at: Patch::Set(Some(at)),
                ..Default::default()
            },
        },
        (LobbyPhase::InProgress, LobbyAction::Reset)
        | (LobbyPhase::Finished, LobbyAction::Reset) => {
            // Settings and game code survive a reset so a rematch does not
            // need a new code. The joined participant, when still present,
            // keeps their accepted approval but must ready up again.
            let (next_status, approval) = if record.joined_id.is_some() {
                (MatchStatus::OpponentJoined, Patch::Keep)
            } else {
                (MatchStatus::Waiting, Patch::Set(Approval::Pending))
            };
            WritePlan {
                guard: MatchGuard {
                    status: Some(record.status),
                    joined_present: Some(record.joined_id.is_some()),
                    ..Default::default()
                },
                patch: MatchPatch {
                    status: Patch::Set(next_status),
                    approval,
                    ready: Patch::Set(false),
                    host_result: Patch::Set(None),
                    joined_result: Patch::Set(None),
                    started_at: Patch::Set(None),
                    ..Default::default()
                },
            }
        }
        (LobbyPhase::Waiting, LobbyAction::UpdateSettings(settings))
        | (LobbyPhase::OpponentJoined { .. }, LobbyAction::UpdateSettings(settings)) => {
            WritePlan {
                guard: MatchGuard {
                    status: Some(record.status),
                    ..Default::default()
                },
                patch: MatchPatch {
                    settings: Patch::Set(settings),
                    ..Default::default()
                },
            }
        }
        (phase, action) => return Err(InvalidTransition { phase, action }),
    };

    Ok(plan)
}
