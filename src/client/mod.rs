//! Client-side orchestration for one match participant.
//!
//! Both participants' apps embed this module: the typed API client wraps the
//! lobby and score endpoints, the poller turns periodic record reads into
//! edge-triggered events, and the match runner plays an in-progress match
//! through to the resolved scoreboard.

/// Typed HTTP client for the lobby and score endpoints.
pub mod api;
/// Fixed-cadence record poller emitting edge-triggered lobby events.
pub mod poller;
/// Gameplay loop for one participant of an in-progress match.
pub mod runner;
