use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod lobby;
pub mod maintenance;
pub mod participant;
pub mod score;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(lobby::router())
        .merge(score::router())
        .merge(maintenance::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
