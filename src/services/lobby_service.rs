//! Business logic powering the lobby REST routes.
//!
//! Every mutating operation follows the same discipline: load the record,
//! check the caller's role, plan the transition against the observed phase,
//! and issue exactly one guarded conditional write. A write that matches
//! zero records is a soft failure — the state moved under the caller, who
//! will observe the new state on the next poll tick.

use std::time::SystemTime;

use rand::{Rng, rng};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{Approval, MatchEntity, MatchGuard, MatchSettingsEntity, MatchStatus},
        storage::StorageError,
    },
    dto::{
        lobby::{CreateLobbyRequest, LobbyPreview, LobbySummary, UpdateSettingsRequest},
        validation::{GAME_CODE_LENGTH, validate_game_code},
    },
    dto::format_system_time,
    error::ServiceError,
    state::{
        SharedState,
        lobby::{self, LobbyAction},
    },
};

const GAME_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 8;

/// Open a new lobby on behalf of `host`.
pub async fn create_lobby(
    state: &SharedState,
    host: Uuid,
    request: CreateLobbyRequest,
) -> Result<LobbySummary, ServiceError> {
    request.validate()?;
    let store = state.require_match_store().await?;
    let settings: MatchSettingsEntity = request.settings.into();

    // Codes are random, so a collision with a live lobby is possible;
    // the unique-code constraint reports it and we draw again.
    for _ in 0..MAX_CODE_ATTEMPTS {
        let record = new_record(host, generate_game_code(), settings.clone(), state);
        match store.insert_match(record.clone()).await {
            Ok(()) => return Ok(record.into()),
            Err(StorageError::CodeConflict { code }) => {
                debug!(%code, "game code collision; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::CodeAllocation)
}

/// Public-safe summary for anyone holding a game code.
pub async fn preview_lobby(state: &SharedState, code: String) -> Result<LobbyPreview, ServiceError> {
    validate_game_code(&code).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let store = state.require_match_store().await?;

    let Some(record) = store.find_by_code(code.clone()).await? else {
        return Err(ServiceError::NotFound(format!("no lobby with code `{code}`")));
    };

    match record.status {
        MatchStatus::Waiting => {}
        MatchStatus::OpponentJoined => {
            return Err(ServiceError::InvalidState(
                "lobby already has a second participant".into(),
            ));
        }
        MatchStatus::InProgress | MatchStatus::Finished => {
            return Err(ServiceError::InvalidState(
                "lobby is closed to new players".into(),
            ));
        }
    }

    if SystemTime::now() >= record.expires_at {
        return Err(ServiceError::Expired("this lobby's code has expired".into()));
    }

    let host_name = resolve_name(state, record.host_id).await;

    Ok(LobbyPreview {
        game_code: record.game_code,
        host_name,
        settings: record.settings.into(),
        created_at: format_system_time(record.created_at),
        expires_at: format_system_time(record.expires_at),
    })
}

/// Join a waiting lobby via its game code.
pub async fn join_lobby(
    state: &SharedState,
    caller: Uuid,
    code: String,
) -> Result<LobbySummary, ServiceError> {
    validate_game_code(&code).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let store = state.require_match_store().await?;

    let Some(record) = store.find_by_code(code.clone()).await? else {
        return Err(ServiceError::NotFound(format!("no lobby with code `{code}`")));
    };

    if record.host_id == caller {
        return Err(ServiceError::InvalidInput(
            "the host cannot join their own lobby".into(),
        ));
    }

    let now = SystemTime::now();
    if record.status == MatchStatus::Waiting && now >= record.expires_at {
        return Err(ServiceError::Expired("this lobby's code has expired".into()));
    }

    apply_plan(
        store.as_ref(),
        record,
        LobbyAction::Join {
            participant: caller,
            now,
        },
    )
    .await
    .map(Into::into)
}

/// Full record read for a participant; this is the poll target.
pub async fn get_lobby(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    let store = state.require_match_store().await?;
    let record = find_record(store.as_ref(), id).await?;
    ensure_participant(&record, caller)?;
    Ok(record.into())
}

/// Host accepts the joined participant.
pub async fn accept_opponent(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    host_action(state, caller, id, LobbyAction::Accept).await
}

/// Host rejects the joined participant, returning the lobby to waiting.
pub async fn reject_opponent(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    host_action(state, caller, id, LobbyAction::Reject).await
}

/// Host removes the joined participant, returning the lobby to waiting.
pub async fn kick_opponent(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    host_action(state, caller, id, LobbyAction::Kick).await
}

/// Joined participant declares readiness.
pub async fn declare_ready(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    let store = state.require_match_store().await?;
    let record = find_record(store.as_ref(), id).await?;
    ensure_joined(&record, caller)?;
    apply_plan(
        store.as_ref(),
        record,
        LobbyAction::Ready {
            participant: caller,
        },
    )
    .await
    .map(Into::into)
}

/// Outcome of a leave request; the host side deletes the whole lobby.
#[derive(Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The lobby was deleted (host left).
    Deleted,
    /// The joined seat was cleared and the lobby went back to waiting.
    SeatCleared,
}

/// Leave the lobby. The host leaving destroys the record; the joined
/// participant leaving clears their seat.
pub async fn leave_lobby(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LeaveOutcome, ServiceError> {
    let store = state.require_match_store().await?;
    let record = find_record(store.as_ref(), id).await?;

    if record.host_id == caller {
        let guard = MatchGuard {
            host_id: Some(caller),
            ..Default::default()
        };
        if !store.delete_match(id, guard).await? {
            // The record vanished between the read and the delete; the goal
            // state is reached either way.
            debug!(%id, "lobby already gone when the host left");
        }
        return Ok(LeaveOutcome::Deleted);
    }

    ensure_joined(&record, caller)?;
    apply_plan(
        store.as_ref(),
        record,
        LobbyAction::LeaveJoined {
            participant: caller,
        },
    )
    .await?;
    Ok(LeaveOutcome::SeatCleared)
}

/// Host starts the match once approval and readiness are settled.
pub async fn start_match(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    host_action(
        state,
        caller,
        id,
        LobbyAction::Start {
            at: SystemTime::now(),
        },
    )
    .await
}

/// Host rewinds the match for a rematch, keeping code and settings.
pub async fn reset_match(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
) -> Result<LobbySummary, ServiceError> {
    host_action(state, caller, id, LobbyAction::Reset).await
}

/// Host replaces the quiz settings before the match starts.
pub async fn update_settings(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
    request: UpdateSettingsRequest,
) -> Result<LobbySummary, ServiceError> {
    request.validate()?;
    host_action(
        state,
        caller,
        id,
        LobbyAction::UpdateSettings(request.settings.into()),
    )
    .await
}

async fn host_action(
    state: &SharedState,
    caller: Uuid,
    id: Uuid,
    action: LobbyAction,
) -> Result<LobbySummary, ServiceError> {
    let store = state.require_match_store().await?;
    let record = find_record(store.as_ref(), id).await?;
    ensure_host(&record, caller)?;
    apply_plan(store.as_ref(), record, action).await.map(Into::into)
}

/// Plan the transition and issue its guarded write, reflecting the patch on
/// a local copy for the response.
async fn apply_plan(
    store: &dyn MatchStore,
    record: MatchEntity,
    action: LobbyAction,
) -> Result<MatchEntity, ServiceError> {
    let write =
        lobby::plan(&record, action).map_err(|err| ServiceError::InvalidState(err.to_string()))?;

    let applied = store
        .update_match(record.id, write.guard, write.patch.clone())
        .await?;
    if !applied {
        return Err(ServiceError::InvalidState(
            "the lobby changed under this operation; re-read and retry".into(),
        ));
    }

    let mut updated = record;
    write.patch.apply_to(&mut updated);
    updated.updated_at = SystemTime::now();
    Ok(updated)
}

async fn find_record(store: &dyn MatchStore, id: Uuid) -> Result<MatchEntity, ServiceError> {
    store
        .find_match(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{id}` not found")))
}

fn ensure_host(record: &MatchEntity, caller: Uuid) -> Result<(), ServiceError> {
    if record.host_id != caller {
        return Err(ServiceError::Forbidden(
            "only the host may perform this operation".into(),
        ));
    }
    Ok(())
}

fn ensure_joined(record: &MatchEntity, caller: Uuid) -> Result<(), ServiceError> {
    if record.joined_id != Some(caller) {
        return Err(ServiceError::Forbidden(
            "only the joined participant may perform this operation".into(),
        ));
    }
    Ok(())
}

fn ensure_participant(record: &MatchEntity, caller: Uuid) -> Result<(), ServiceError> {
    if record.host_id != caller && record.joined_id != Some(caller) {
        return Err(ServiceError::Forbidden(
            "caller is not a participant of this match".into(),
        ));
    }
    Ok(())
}

async fn resolve_name(state: &SharedState, participant: Uuid) -> Option<String> {
    match state.identity().display_name(participant).await {
        Ok(name) => name,
        Err(err) => {
            debug!(%participant, error = %err, "display name lookup failed");
            None
        }
    }
}

fn generate_game_code() -> String {
    let mut rng = rng();
    (0..GAME_CODE_LENGTH)
        .map(|_| {
            let position = rng.random_range(0..GAME_CODE_ALPHABET.len());
            GAME_CODE_ALPHABET[position] as char
        })
        .collect()
}

fn new_record(
    host: Uuid,
    game_code: String,
    settings: MatchSettingsEntity,
    state: &SharedState,
) -> MatchEntity {
    let now = SystemTime::now();
    MatchEntity {
        id: Uuid::new_v4(),
        game_code,
        host_id: host,
        joined_id: None,
        settings,
        status: MatchStatus::Waiting,
        approval: Approval::Pending,
        ready: false,
        host_result: None,
        joined_result: None,
        created_at: now,
        expires_at: now + state.config().lobby_ttl(),
        started_at: None,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collab::identity::StaticIdentityProvider,
        config::AppConfig,
        dao::match_store::memory::MemoryMatchStore,
        dao::models::GameMode,
        dto::lobby::MatchSettingsDto,
        state::AppState,
    };
    use std::{sync::Arc, time::Duration};

    async fn test_state() -> (SharedState, MemoryMatchStore) {
        let store = MemoryMatchStore::default();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(StaticIdentityProvider::default()),
        );
        state.install_match_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn settings() -> MatchSettingsDto {
        MatchSettingsDto {
            category: "animal".into(),
            subcategory: 0,
            num_questions: 5,
            timer_secs: 10,
            mode: GameMode::Vocab,
        }
    }

    fn create_request() -> CreateLobbyRequest {
        CreateLobbyRequest {
            settings: settings(),
        }
    }

    async fn opened_lobby(state: &SharedState) -> (Uuid, LobbySummary) {
        let host = Uuid::new_v4();
        let summary = create_lobby(state, host, create_request()).await.unwrap();
        (host, summary)
    }

    async fn joined_lobby(state: &SharedState) -> (Uuid, Uuid, LobbySummary) {
        let (host, summary) = opened_lobby(state).await;
        let guest = Uuid::new_v4();
        let summary = join_lobby(state, guest, summary.game_code.clone())
            .await
            .unwrap();
        (host, guest, summary)
    }

    #[tokio::test]
    async fn create_opens_a_waiting_lobby_with_ttl() {
        let (state, store) = test_state().await;
        let (_host, summary) = opened_lobby(&state).await;

        assert_eq!(summary.game_code.len(), 6);
        assert_eq!(summary.status, MatchStatus::Waiting);
        assert_eq!(summary.approval, Approval::Pending);
        assert!(summary.joined_id.is_none());

        let record = store.find_match(summary.id).await.unwrap().unwrap();
        assert_eq!(
            record.expires_at,
            record.created_at + Duration::from_secs(300)
        );
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_settings() {
        let (state, _) = test_state().await;
        let mut request = create_request();
        request.settings.num_questions = 0;
        let err = create_lobby(&state, Uuid::new_v4(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn join_fills_the_seat_and_asks_for_approval() {
        let (state, _) = test_state().await;
        let (_host, guest, summary) = joined_lobby(&state).await;

        assert_eq!(summary.status, MatchStatus::OpponentJoined);
        assert_eq!(summary.approval, Approval::Pending);
        assert_eq!(summary.joined_id, Some(guest));
        assert!(!summary.ready);
    }

    #[tokio::test]
    async fn host_cannot_join_own_lobby() {
        let (state, _) = test_state().await;
        let (host, summary) = opened_lobby(&state).await;
        let err = join_lobby(&state, host, summary.game_code)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn second_join_bounces_off_a_full_lobby() {
        let (state, _) = test_state().await;
        let (_host, _guest, summary) = joined_lobby(&state).await;
        let err = join_lobby(&state, Uuid::new_v4(), summary.game_code)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn join_and_preview_refuse_an_expired_code() {
        let (state, store) = test_state().await;
        let host = Uuid::new_v4();

        // Insert a lobby whose waiting period is already over.
        let mut record = new_record(host, "EXPIRD".into(), settings().into(), &state);
        record.expires_at = record.created_at - Duration::from_secs(1);
        let id = record.id;
        store.insert_match(record).await.unwrap();

        let err = join_lobby(&state, Uuid::new_v4(), "EXPIRD".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Expired(_)));

        let err = preview_lobby(&state, "EXPIRD".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Expired(_)));

        // The record still exists until a sweep reclaims it.
        assert!(get_lobby(&state, host, id).await.is_ok());
    }

    #[tokio::test]
    async fn preview_hides_participant_identifiers() {
        let (state, _) = test_state().await;
        let (_host, summary) = opened_lobby(&state).await;
        let preview = preview_lobby(&state, summary.game_code.clone())
            .await
            .unwrap();
        assert_eq!(preview.game_code, summary.game_code);
        assert_eq!(preview.settings, summary.settings);
    }

    #[tokio::test]
    async fn lobby_reads_are_participant_only() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;

        assert!(get_lobby(&state, host, summary.id).await.is_ok());
        assert!(get_lobby(&state, guest, summary.id).await.is_ok());
        let err = get_lobby(&state, Uuid::new_v4(), summary.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn host_gate_rejects_the_joined_participant() {
        let (state, _) = test_state().await;
        let (_host, guest, summary) = joined_lobby(&state).await;

        for result in [
            accept_opponent(&state, guest, summary.id).await,
            reject_opponent(&state, guest, summary.id).await,
            kick_opponent(&state, guest, summary.id).await,
            start_match(&state, guest, summary.id).await,
            reset_match(&state, guest, summary.id).await,
        ] {
            assert!(matches!(result.unwrap_err(), ServiceError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn ready_gate_rejects_the_host() {
        let (state, _) = test_state().await;
        let (host, _guest, summary) = joined_lobby(&state).await;
        accept_opponent(&state, host, summary.id).await.unwrap();

        let err = declare_ready(&state, host, summary.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_needs_both_acceptance_and_readiness() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;

        // Neither accepted nor ready.
        assert!(matches!(
            start_match(&state, host, summary.id).await.unwrap_err(),
            ServiceError::InvalidState(_)
        ));

        // Ready cannot even be declared before acceptance.
        assert!(matches!(
            declare_ready(&state, guest, summary.id).await.unwrap_err(),
            ServiceError::InvalidState(_)
        ));

        accept_opponent(&state, host, summary.id).await.unwrap();
        assert!(matches!(
            start_match(&state, host, summary.id).await.unwrap_err(),
            ServiceError::InvalidState(_)
        ));

        declare_ready(&state, guest, summary.id).await.unwrap();
        let started = start_match(&state, host, summary.id).await.unwrap();
        assert_eq!(started.status, MatchStatus::InProgress);
        assert!(started.started_at.is_some());
    }

    #[tokio::test]
    async fn kick_rewinds_every_seat_field() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;
        accept_opponent(&state, host, summary.id).await.unwrap();
        declare_ready(&state, guest, summary.id).await.unwrap();

        let kicked = kick_opponent(&state, host, summary.id).await.unwrap();
        assert_eq!(kicked.status, MatchStatus::Waiting);
        assert_eq!(kicked.approval, Approval::Pending);
        assert!(!kicked.ready);
        assert!(kicked.joined_id.is_none());
    }

    #[tokio::test]
    async fn joined_leave_matches_kick_semantics() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;
        accept_opponent(&state, host, summary.id).await.unwrap();

        let outcome = leave_lobby(&state, guest, summary.id).await.unwrap();
        assert_eq!(outcome, LeaveOutcome::SeatCleared);

        let after = get_lobby(&state, host, summary.id).await.unwrap();
        assert_eq!(after.status, MatchStatus::Waiting);
        assert_eq!(after.approval, Approval::Pending);
        assert!(after.joined_id.is_none());
    }

    #[tokio::test]
    async fn host_leave_destroys_the_lobby() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;

        let outcome = leave_lobby(&state, host, summary.id).await.unwrap();
        assert_eq!(outcome, LeaveOutcome::Deleted);

        let err = get_lobby(&state, guest, summary.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_preserves_code_settings_and_opponent() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;
        accept_opponent(&state, host, summary.id).await.unwrap();
        declare_ready(&state, guest, summary.id).await.unwrap();
        start_match(&state, host, summary.id).await.unwrap();

        let after = reset_match(&state, host, summary.id).await.unwrap();
        assert_eq!(after.game_code, summary.game_code);
        assert_eq!(after.settings, summary.settings);
        assert_eq!(after.joined_id, Some(guest));
        assert_eq!(after.status, MatchStatus::OpponentJoined);
        assert_eq!(after.approval, Approval::Accepted);
        assert!(!after.ready);
        assert!(after.started_at.is_none());
        assert!(after.host_score.is_none());
        assert!(after.joined_score.is_none());
    }

    #[tokio::test]
    async fn settings_editable_until_start_only() {
        let (state, _) = test_state().await;
        let (host, guest, summary) = joined_lobby(&state).await;

        let mut changed = settings();
        changed.category = "food".into();
        changed.num_questions = 10;
        let updated = update_settings(
            &state,
            host,
            summary.id,
            UpdateSettingsRequest {
                settings: changed.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.settings, changed);

        accept_opponent(&state, host, summary.id).await.unwrap();
        declare_ready(&state, guest, summary.id).await.unwrap();
        start_match(&state, host, summary.id).await.unwrap();

        let err = update_settings(
            &state,
            host,
            summary.id,
            UpdateSettingsRequest { settings: changed },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn game_codes_stay_unique_among_live_lobbies() {
        let (state, store) = test_state().await;
        let mut codes = std::collections::HashSet::new();
        for _ in 0..32 {
            let (_, summary) = opened_lobby(&state).await;
            assert!(codes.insert(summary.game_code.clone()));
            let record = store.find_match(summary.id).await.unwrap().unwrap();
            assert_eq!(record.game_code, summary.game_code);
        }
    }
}
