//! Keeps a match store connected, flipping the shared state in and out of
//! degraded mode as connectivity changes.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const HEALTH_INTERVAL: Duration = Duration::from_secs(5);
const RECONNECT_ATTEMPTS: u32 = 3;

/// Connect the store, then watch its health until reconnection becomes
/// hopeless; at that point fall back to connecting from scratch with
/// exponential backoff.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match connect().await {
            Ok(store) => {
                info!("storage connection established; leaving degraded mode");
                state.install_match_store(store.clone()).await;
                backoff = INITIAL_BACKOFF;

                watch_health(&state, store.as_ref()).await;
                warn!("exhausted storage reconnect attempts; reconnecting from scratch");
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }

        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Poll the store's health on a fixed interval. Returns once a failed health
/// check cannot be repaired by [`attempt_reconnect`].
async fn watch_health(state: &SharedState, store: &dyn MatchStore) {
    let mut degraded = false;

    loop {
        match store.health_check().await {
            Ok(()) => {
                if degraded {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                    degraded = false;
                }
                sleep(HEALTH_INTERVAL).await;
            }
            Err(err) => {
                if !degraded {
                    warn!(error = %err, "storage health check failed; entering degraded mode");
                    state.update_degraded(true).await;
                    degraded = true;
                }

                if !attempt_reconnect(store).await {
                    return;
                }

                info!("storage reconnection succeeded after health check failure");
                state.update_degraded(false).await;
                degraded = false;
                sleep(HEALTH_INTERVAL).await;
            }
        }
    }
}

/// Try a bounded number of reconnects with backoff; `true` on success.
async fn attempt_reconnect(store: &dyn MatchStore) -> bool {
    let mut delay = INITIAL_BACKOFF;

    for attempt in 1..=RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                if attempt < RECONNECT_ATTEMPTS {
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    false
}
