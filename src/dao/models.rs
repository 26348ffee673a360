use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// The lobby is open and waiting for a second participant.
    Waiting,
    /// A second participant joined; approval and readiness are being settled.
    OpponentJoined,
    /// Both sides are playing their question lists.
    InProgress,
    /// Both scores were submitted and the outcome was resolved.
    Finished,
}

/// Host decision about the joined participant.
///
/// Kept as an explicit tri-state so "never asked" and "explicitly rejected"
/// stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    /// No decision yet (or no joined participant to decide about).
    Pending,
    /// The host accepted the joined participant.
    Accepted,
    /// The host rejected the joined participant.
    Rejected,
}

/// Kind of quiz played in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Single-word vocabulary questions.
    Vocab,
    /// Full-sentence questions.
    Sentence,
}

/// Which seat of the match a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// The participant who created the lobby.
    Host,
    /// The second participant.
    Joined,
}

/// Quiz settings configured by the host before the match starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSettingsEntity {
    /// Vocabulary category the questions are drawn from.
    pub category: String,
    /// Subcategory within the category; 0 means "mix all subcategories".
    pub subcategory: u32,
    /// Number of questions each side plays.
    pub num_questions: u32,
    /// Per-question countdown in seconds.
    pub timer_secs: u32,
    /// Quiz kind.
    pub mode: GameMode,
}

/// Final score and per-question stats reported by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantResultEntity {
    /// Accumulated score across all questions.
    pub score: i64,
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

/// One PvP match record: the shared row both participants poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEntity {
    /// Primary key of the match, stable for its lifetime.
    pub id: Uuid,
    /// Human-shareable 6-character join token, unique among live records.
    pub game_code: String,
    /// Participant who created the lobby.
    pub host_id: Uuid,
    /// Second participant, if one has joined.
    pub joined_id: Option<Uuid>,
    /// Quiz settings, host-editable until the match starts.
    pub settings: MatchSettingsEntity,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Host decision about the joined participant.
    pub approval: Approval,
    /// Whether the joined participant declared readiness.
    pub ready: bool,
    /// Host's submitted result, once available.
    pub host_result: Option<ParticipantResultEntity>,
    /// Joined participant's submitted result, once available.
    pub joined_result: Option<ParticipantResultEntity>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Instant after which a still-waiting lobby may be reclaimed.
    pub expires_at: SystemTime,
    /// Instant the match entered `InProgress`, if it did.
    pub started_at: Option<SystemTime>,
    /// Last mutation timestamp, stamped by the store on every write.
    pub updated_at: SystemTime,
}

/// Field update that distinguishes "leave untouched" from "set this value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value untouched.
    Keep,
    /// Replace the stored value.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T: Clone> Patch<T> {
    /// Apply the patch to a field slot.
    pub fn apply_to(&self, slot: &mut T) {
        if let Patch::Set(value) = self {
            *slot = value.clone();
        }
    }

    /// The value this patch would write, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Keep => None,
            Patch::Set(value) => Some(value),
        }
    }
}

/// Precondition attached to a guarded write.
///
/// Every populated field must still match the stored record at write time for
/// the write to take effect; a mismatch makes the write affect zero records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchGuard {
    /// Expected lifecycle status.
    pub status: Option<MatchStatus>,
    /// Expected approval value.
    pub approval: Option<Approval>,
    /// Expected readiness flag.
    pub ready: Option<bool>,
    /// Expected host identity.
    pub host_id: Option<Uuid>,
    /// Expected joined participant identity.
    pub joined_id: Option<Uuid>,
    /// Whether a joined participant must (or must not) be present.
    pub joined_present: Option<bool>,
    /// The record's `expires_at` must lie strictly after this instant.
    pub not_expired_at: Option<SystemTime>,
}

impl MatchGuard {
    /// Evaluate the guard against a record.
    pub fn matches(&self, record: &MatchEntity) -> bool {
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }
        if self.approval.is_some_and(|approval| record.approval != approval) {
            return false;
        }
        if self.ready.is_some_and(|ready| record.ready != ready) {
            return false;
        }
        if self.host_id.is_some_and(|host| record.host_id != host) {
            return false;
        }
        if self
            .joined_id
            .is_some_and(|joined| record.joined_id != Some(joined))
        {
            return false;
        }
        if self
            .joined_present
            .is_some_and(|present| record.joined_id.is_some() != present)
        {
            return false;
        }
        if self
            .not_expired_at
            .is_some_and(|instant| record.expires_at <= instant)
        {
            return false;
        }
        true
    }
}

/// Multi-field update applied atomically when its guard matches.
///
/// Operations that touch several fields (e.g. a kick clears four of them)
/// express the whole reset as one patch so no reader observes a half-applied
/// state.
#[derive(Debug, Clone, Default)]
pub struct MatchPatch {
    /// New lifecycle status.
    pub status: Patch<MatchStatus>,
    /// New approval value.
    pub approval: Patch<Approval>,
    /// New readiness flag.
    pub ready: Patch<bool>,
    /// New joined participant slot (`Set(None)` clears it).
    pub joined_id: Patch<Option<Uuid>>,
    /// Replacement quiz settings.
    pub settings: Patch<MatchSettingsEntity>,
    /// New host result slot.
    pub host_result: Patch<Option<ParticipantResultEntity>>,
    /// New joined result slot.
    pub joined_result: Patch<Option<ParticipantResultEntity>>,
    /// New start timestamp slot.
    pub started_at: Patch<Option<SystemTime>>,
}

impl MatchPatch {
    /// Apply every populated field to a record. `updated_at` is the store's
    /// responsibility and is not touched here.
    pub fn apply_to(&self, record: &mut MatchEntity) {
        self.status.apply_to(&mut record.status);
        self.approval.apply_to(&mut record.approval);
        self.ready.apply_to(&mut record.ready);
        self.joined_id.apply_to(&mut record.joined_id);
        self.settings.apply_to(&mut record.settings);
        self.host_result.apply_to(&mut record.host_result);
        self.joined_result.apply_to(&mut record.joined_result);
        self.started_at.apply_to(&mut record.started_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record() -> MatchEntity {
        let now = SystemTime::now();
        MatchEntity {
            id: Uuid::new_v4(),
            game_code: "A1B2C3".into(),
            host_id: Uuid::new_v4(),
            joined_id: None,
            settings: MatchSettingsEntity {
                category: "animal".into(),
                subcategory: 0,
                num_questions: 5,
                timer_secs: 10,
                mode: GameMode::Vocab,
            },
            status: MatchStatus::Waiting,
            approval: Approval::Pending,
            ready: false,
            host_result: None,
            joined_result: None,
            created_at: now,
            expires_at: now + Duration::from_secs(300),
            started_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn empty_guard_matches_anything() {
        assert!(MatchGuard::default().matches(&record()));
    }

    #[test]
    fn status_guard_rejects_mismatch() {
        let guard = MatchGuard {
            status: Some(MatchStatus::InProgress),
            ..Default::default()
        };
        assert!(!guard.matches(&record()));
    }

    #[test]
    fn joined_present_guard_distinguishes_empty_slot() {
        let mut rec = record();
        let must_be_empty = MatchGuard {
            joined_present: Some(false),
            ..Default::default()
        };
        let must_be_full = MatchGuard {
            joined_present: Some(true),
            ..Default::default()
        };
        assert!(must_be_empty.matches(&rec));
        assert!(!must_be_full.matches(&rec));

        rec.joined_id = Some(Uuid::new_v4());
        assert!(!must_be_empty.matches(&rec));
        assert!(must_be_full.matches(&rec));
    }

    #[test]
    fn expiry_guard_uses_strict_inequality() {
        let rec = record();
        let before = MatchGuard {
            not_expired_at: Some(rec.expires_at - Duration::from_secs(1)),
            ..Default::default()
        };
        let exactly = MatchGuard {
            not_expired_at: Some(rec.expires_at),
            ..Default::default()
        };
        assert!(before.matches(&rec));
        assert!(!exactly.matches(&rec));
    }

    #[test]
    fn patch_applies_only_populated_fields() {
        let mut rec = record();
        let joined = Uuid::new_v4();
        let patch = MatchPatch {
            status: Patch::Set(MatchStatus::OpponentJoined),
            joined_id: Patch::Set(Some(joined)),
            ..Default::default()
        };
        patch.apply_to(&mut rec);
        assert_eq!(rec.status, MatchStatus::OpponentJoined);
        assert_eq!(rec.joined_id, Some(joined));
        assert_eq!(rec.approval, Approval::Pending);
        assert_eq!(rec.settings.num_questions, 5);
    }
}
