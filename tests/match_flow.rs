//! End-to-end match flow over the in-memory store: share a code, approve,
//! ready up, play, submit both scores, resolve, and rematch.

use std::sync::Arc;

use uuid::Uuid;
use word_clash_back::{
    collab::identity::StaticIdentityProvider,
    config::AppConfig,
    dao::{
        match_store::memory::MemoryMatchStore,
        models::{Approval, GameMode, MatchStatus, ParticipantRole},
    },
    dto::{
        lobby::{CreateLobbyRequest, MatchSettingsDto},
        score::{ScoreSubmission, StatsDto, Winner},
    },
    services::{lobby_service, score_service},
    state::{AppState, SharedState},
};

async fn app(identity: StaticIdentityProvider) -> SharedState {
    let state = AppState::new(AppConfig::default(), Arc::new(identity));
    state
        .install_match_store(Arc::new(MemoryMatchStore::default()))
        .await;
    state
}

fn submission(role: ParticipantRole, score: i64) -> ScoreSubmission {
    ScoreSubmission {
        role,
        score,
        stats: StatsDto {
            questions: 5,
            correct: 4,
            wrong: 1,
            fastest_ms: 1_200,
            slowest_ms: 7_800,
        },
    }
}

#[tokio::test]
async fn full_match_from_code_share_to_resolution() {
    let identity = StaticIdentityProvider::default();
    let host = Uuid::new_v4();
    let guest = Uuid::new_v4();
    identity.insert(host, "Mina");
    identity.insert(guest, "Ravi");
    let state = app(identity).await;

    // The host opens a lobby and gets a shareable code.
    let lobby = lobby_service::create_lobby(
        &state,
        host,
        CreateLobbyRequest {
            settings: MatchSettingsDto {
                category: "animal".into(),
                subcategory: 0,
                num_questions: 5,
                timer_secs: 10,
                mode: GameMode::Vocab,
            },
        },
    )
    .await
    .unwrap();
    assert_eq!(lobby.status, MatchStatus::Waiting);
    assert_eq!(lobby.game_code.len(), 6);

    // The second player previews the code, then takes the seat.
    let preview = lobby_service::preview_lobby(&state, lobby.game_code.clone())
        .await
        .unwrap();
    assert_eq!(preview.host_name.as_deref(), Some("Mina"));

    let joined = lobby_service::join_lobby(&state, guest, lobby.game_code.clone())
        .await
        .unwrap();
    assert_eq!(joined.status, MatchStatus::OpponentJoined);
    assert_eq!(joined.approval, Approval::Pending);

    // Approval prompt on the host side, then readiness on the guest side.
    let accepted = lobby_service::accept_opponent(&state, host, lobby.id)
        .await
        .unwrap();
    assert_eq!(accepted.approval, Approval::Accepted);
    assert_eq!(accepted.status, MatchStatus::OpponentJoined);

    let ready = lobby_service::declare_ready(&state, guest, lobby.id)
        .await
        .unwrap();
    assert!(ready.ready);

    let started = lobby_service::start_match(&state, host, lobby.id)
        .await
        .unwrap();
    assert_eq!(started.status, MatchStatus::InProgress);
    assert!(started.started_at.is_some());

    // Host finishes first; the match stays open for the other side.
    let board = score_service::submit_score(
        &state,
        host,
        lobby.id,
        submission(ParticipantRole::Host, 420),
    )
    .await
    .unwrap();
    assert_eq!(board.host_score, Some(420));
    assert!(!board.both_submitted);
    assert!(board.result.is_none());

    // The guest's submission completes the aggregate and resolves the match.
    let board = score_service::submit_score(
        &state,
        guest,
        lobby.id,
        submission(ParticipantRole::Joined, 380),
    )
    .await
    .unwrap();
    assert!(board.both_submitted);
    let result = board.result.expect("resolved outcome");
    assert_eq!(result.winner, Winner::Host);
    assert_eq!(result.host_name.as_deref(), Some("Mina"));
    assert_eq!(result.joined_name.as_deref(), Some("Ravi"));

    let after = lobby_service::get_lobby(&state, guest, lobby.id).await.unwrap();
    assert_eq!(after.status, MatchStatus::Finished);

    // Rematch: same code and settings, cleared scores and readiness.
    let rematch = lobby_service::reset_match(&state, host, lobby.id)
        .await
        .unwrap();
    assert_eq!(rematch.game_code, lobby.game_code);
    assert_eq!(rematch.settings, lobby.settings);
    assert_eq!(rematch.status, MatchStatus::OpponentJoined);
    assert_eq!(rematch.joined_id, Some(guest));
    assert!(!rematch.ready);
    assert!(rematch.host_score.is_none());
    assert!(rematch.joined_score.is_none());

    // The cleared aggregate no longer reports an outcome.
    let board = score_service::read_scores(&state, host, lobby.id).await.unwrap();
    assert!(!board.both_submitted);
    assert!(board.result.is_none());
}

#[tokio::test]
async fn rejected_opponent_can_be_replaced() {
    let state = app(StaticIdentityProvider::default()).await;
    let host = Uuid::new_v4();

    let lobby = lobby_service::create_lobby(
        &state,
        host,
        CreateLobbyRequest {
            settings: MatchSettingsDto {
                category: "food".into(),
                subcategory: 2,
                num_questions: 3,
                timer_secs: 15,
                mode: GameMode::Sentence,
            },
        },
    )
    .await
    .unwrap();

    let first = Uuid::new_v4();
    lobby_service::join_lobby(&state, first, lobby.game_code.clone())
        .await
        .unwrap();
    let rejected = lobby_service::reject_opponent(&state, host, lobby.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, MatchStatus::Waiting);
    assert!(rejected.joined_id.is_none());

    // The freed seat is joinable again with the same code.
    let second = Uuid::new_v4();
    let rejoined = lobby_service::join_lobby(&state, second, lobby.game_code.clone())
        .await
        .unwrap();
    assert_eq!(rejoined.joined_id, Some(second));
    assert_eq!(rejoined.approval, Approval::Pending);
}
