//! Maintenance sweeps reclaiming stale match records.
//!
//! The expire sweep reclaims lobbies that never found an opponent; it is
//! restricted to `Waiting` records. The inactive sweep is the backstop for
//! every other abandonment mode — participants simply stop polling, which
//! leaves no other trace — and reclaims any record untouched for hours.

use std::time::SystemTime;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::{error::ServiceError, state::SharedState};

/// Delete waiting lobbies whose TTL has passed. Returns the deletion count.
pub async fn run_expired_sweep(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.require_match_store().await?;
    Ok(store.delete_expired(SystemTime::now()).await?)
}

/// Delete records of any status not updated within the inactivity threshold.
/// Returns the deletion count.
pub async fn run_inactive_sweep(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.require_match_store().await?;
    let cutoff = SystemTime::now() - state.config().inactive_after();
    Ok(store.delete_inactive(cutoff).await?)
}

/// Background task running both sweeps on the configured cadence.
///
/// A failing cycle is logged and never aborts the loop; the next tick
/// retries from scratch.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match run_expired_sweep(&state).await {
            Ok(0) => {}
            Ok(count) => info!(count, "expire sweep reclaimed waiting lobbies"),
            Err(err) => warn!(error = %err, "expire sweep failed"),
        }

        match run_inactive_sweep(&state).await {
            Ok(0) => {}
            Ok(count) => info!(count, "inactivity sweep reclaimed abandoned matches"),
            Err(err) => warn!(error = %err, "inactivity sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collab::identity::StaticIdentityProvider,
        config::AppConfig,
        dao::{
            match_store::{MatchStore, memory::MemoryMatchStore},
            models::{Approval, GameMode, MatchEntity, MatchSettingsEntity, MatchStatus},
        },
        state::AppState,
    };
    use std::{sync::Arc, time::Duration};
    use uuid::Uuid;

    fn record(code: &str, status: MatchStatus) -> MatchEntity {
        let now = SystemTime::now();
        MatchEntity {
            id: Uuid::new_v4(),
            game_code: code.into(),
            host_id: Uuid::new_v4(),
            joined_id: None,
            settings: MatchSettingsEntity {
                category: "animal".into(),
                subcategory: 0,
                num_questions: 5,
                timer_secs: 10,
                mode: GameMode::Vocab,
            },
            status,
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

    async fn test_state(store: &MemoryMatchStore) -> SharedState {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(StaticIdentityProvider::default()),
        );
        state.install_match_store(Arc::new(store.clone())).await;
        state
    }

    #[tokio::test]
    async fn expire_sweep_spares_everything_but_stale_waiting() {
        let store = MemoryMatchStore::default();
        let state = test_state(&store).await;
        let now = SystemTime::now();

        let mut stale = record("AAAAAA", MatchStatus::Waiting);
        stale.expires_at = now - Duration::from_secs(5);
        let mut stale_running = record("BBBBBB", MatchStatus::InProgress);
        stale_running.expires_at = now - Duration::from_secs(5);
        let fresh = record("CCCCCC", MatchStatus::Waiting);

        let running_id = stale_running.id;
        let fresh_id = fresh.id;
        store.insert_match(stale).await.unwrap();
        store.insert_match(stale_running).await.unwrap();
        store.insert_match(fresh).await.unwrap();

        assert_eq!(run_expired_sweep(&state).await.unwrap(), 1);
        assert!(store.find_match(running_id).await.unwrap().is_some());
        assert!(store.find_match(fresh_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn inactive_sweep_reclaims_any_status() {
        let store = MemoryMatchStore::default();
        let state = test_state(&store).await;
        let now = SystemTime::now();

        let mut abandoned = record("DDDDDD", MatchStatus::InProgress);
        abandoned.updated_at = now - Duration::from_secs(30_000);
        let mut abandoned_done = record("EEEEEE", MatchStatus::Finished);
        abandoned_done.updated_at = now - Duration::from_secs(30_000);
        let live = record("FFFFFF", MatchStatus::InProgress);

        let live_id = live.id;
        store.insert_match(abandoned).await.unwrap();
        store.insert_match(abandoned_done).await.unwrap();
        store.insert_match(live).await.unwrap();

        assert_eq!(run_inactive_sweep(&state).await.unwrap(), 2);
        assert!(store.find_match(live_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweeps_report_degraded_mode() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(StaticIdentityProvider::default()),
        );
        assert!(matches!(
            run_expired_sweep(&state).await.unwrap_err(),
            ServiceError::Degraded
        ));
    }
}
