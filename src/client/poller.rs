use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::Stream;
use reqwest::StatusCode;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;
use uuid::Uuid;

use super::api::LobbyClient;
use crate::{
    dao::models::{Approval, MatchStatus},
    dto::lobby::LobbySummary,
};

/// Default cadence of the lobby poller.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Edge-triggered changes observed between two reads of the match record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// A second participant took the seat; the host side prompts for approval.
    OpponentJoined {
        /// The participant who joined.
        participant: Uuid,
    },
    /// The host's decision about the caller changed.
    ApprovalChanged {
        /// The new decision.
        approval: Approval,
    },
    /// The caller lost their seat.
    Kicked,
    /// The opponent's seat emptied (host side).
    OpponentLeft,
    /// The joined participant declared readiness (host side).
    OpponentReady,
    /// The match entered `InProgress`; hand over to the match runner.
    Started,
    /// The opponent's final score landed.
    OpponentScorePosted {
        /// The opponent's score.
        score: i64,
    },
    /// The match was resolved.
    Finished,
    /// The record no longer resolves (host left or a sweep reclaimed it).
    Closed,
}

/// Compute the edge-triggered events between two snapshots, from the
/// perspective of participant `me`.
pub fn diff(me: Uuid, previous: &LobbySummary, current: &LobbySummary) -> Vec<LobbyEvent> {
    let mut events = Vec::new();
    let host_side = previous.host_id == me;

    if host_side {
        match (previous.joined_id, current.joined_id) {
            (None, Some(participant)) => events.push(LobbyEvent::OpponentJoined { participant }),
            (Some(_), None) => events.push(LobbyEvent::OpponentLeft),
            (Some(old), Some(new)) if old != new => {
                // Seat changed hands between two ticks.
                events.push(LobbyEvent::OpponentLeft);
                events.push(LobbyEvent::OpponentJoined { participant: new });
            }
            _ => {}
        }

        if !previous.ready && current.ready {
            events.push(LobbyEvent::OpponentReady);
        }
    } else {
        if previous.joined_id == Some(me) && current.joined_id != Some(me) {
            events.push(LobbyEvent::Kicked);
        }

        if previous.approval != current.approval && current.joined_id == Some(me) {
            events.push(LobbyEvent::ApprovalChanged {
                approval: current.approval,
            });
        }
    }

    if previous.status != MatchStatus::InProgress && current.status == MatchStatus::InProgress {
        events.push(LobbyEvent::Started);
    }

    let (previous_opponent, current_opponent) = if host_side {
        (previous.joined_score, current.joined_score)
    } else {
        (previous.host_score, current.host_score)
    };
    if previous_opponent.is_none() {
        if let Some(score) = current_opponent {
            events.push(LobbyEvent::OpponentScorePosted { score });
        }
    }

    if previous.status != MatchStatus::Finished && current.status == MatchStatus::Finished {
        events.push(LobbyEvent::Finished);
    }

    events
}

/// Polls one match record on a fixed cadence and yields edge-triggered
/// events.
///
/// Dropping the stream simply stops polling; the server is never told, which
/// is why the inactivity sweep exists as the reclamation backstop.
pub struct LobbyPoller {
    client: Arc<LobbyClient>,
    lobby_id: Uuid,
    poll_interval: Duration,
}

impl LobbyPoller {
    /// Build a poller for one lobby with the default cadence.
    pub fn new(client: Arc<LobbyClient>, lobby_id: Uuid) -> Self {
        Self {
            client,
            lobby_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll cadence.
    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the poll loop as an event stream until the lobby closes or the
    /// stream is dropped.
    pub fn watch(self) -> impl Stream<Item = LobbyEvent> {
        stream! {
            let me = self.client.participant_id();
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut previous: Option<LobbySummary> = None;

            loop {
                ticker.tick().await;

                match self.client.lobby(self.lobby_id).await {
                    Ok(current) => {
                        if let Some(snapshot) = previous.as_ref() {
                            for event in diff(me, snapshot, &current) {
                                yield event;
                            }
                        }
                        previous = Some(current);
                    }
                    Err(err) => match err.status() {
                        Some(StatusCode::NOT_FOUND) | Some(StatusCode::GONE) => {
                            yield LobbyEvent::Closed;
                            break;
                        }
                        // A kicked participant is no longer allowed to read
                        // the record at all, so the kick often surfaces as a
                        // refusal rather than a visible seat change.
                        Some(StatusCode::FORBIDDEN) => {
                            yield LobbyEvent::Kicked;
                            break;
                        }
                        _ => {
                            debug!(error = %err, "lobby poll failed; retrying on next tick");
                        }
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::GameMode;
    use crate::dto::lobby::MatchSettingsDto;

    fn summary(host: Uuid) -> LobbySummary {
        LobbySummary {
            id: Uuid::new_v4(),
            game_code: "A1B2C3".into(),
            host_id: host,
            joined_id: None,
            settings: MatchSettingsDto {
                category: "animal".into(),
                subcategory: 0,
                num_questions: 5,
                timer_secs: 10,
                mode: GameMode::Vocab,
            },
            status: MatchStatus::Waiting,
            approval: Approval::Pending,
            ready: false,
            host_score: None,
            joined_score: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            expires_at: "2026-01-01T00:05:00Z".into(),
            started_at: None,
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn host_sees_the_join_edge_exactly_once() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let before = summary(host);
        let mut after = before.clone();
        after.joined_id = Some(guest);
        after.status = MatchStatus::OpponentJoined;

        assert_eq!(
            diff(host, &before, &after),
            vec![LobbyEvent::OpponentJoined { participant: guest }]
        );
        // No change between identical snapshots: edge-triggered, not level.
        assert!(diff(host, &after, &after).is_empty());
    }

    #[test]
    fn joined_side_sees_approval_changes() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut before = summary(host);
        before.joined_id = Some(guest);
        before.status = MatchStatus::OpponentJoined;
        let mut after = before.clone();
        after.approval = Approval::Accepted;

        assert_eq!(
            diff(guest, &before, &after),
            vec![LobbyEvent::ApprovalChanged {
                approval: Approval::Accepted
            }]
        );
        // The host made the change; no event on their side.
        assert!(diff(host, &before, &after).is_empty());
    }

    #[test]
    fn joined_side_detects_a_kick_via_seat_change() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut before = summary(host);
        before.joined_id = Some(guest);
        before.status = MatchStatus::OpponentJoined;
        let mut after = before.clone();
        after.joined_id = None;
        after.status = MatchStatus::Waiting;

        assert_eq!(diff(guest, &before, &after), vec![LobbyEvent::Kicked]);
        assert_eq!(diff(host, &before, &after), vec![LobbyEvent::OpponentLeft]);
    }

    #[test]
    fn both_sides_see_the_start_edge() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut before = summary(host);
        before.joined_id = Some(guest);
        before.status = MatchStatus::OpponentJoined;
        before.approval = Approval::Accepted;
        before.ready = true;
        let mut after = before.clone();
        after.status = MatchStatus::InProgress;

        assert_eq!(diff(host, &before, &after), vec![LobbyEvent::Started]);
        assert_eq!(diff(guest, &before, &after), vec![LobbyEvent::Started]);
    }

    #[test]
    fn host_sees_readiness_and_opponent_score() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut before = summary(host);
        before.joined_id = Some(guest);
        before.status = MatchStatus::OpponentJoined;
        before.approval = Approval::Accepted;
        let mut after = before.clone();
        after.ready = true;
        assert_eq!(diff(host, &before, &after), vec![LobbyEvent::OpponentReady]);

        let mut playing = after.clone();
        playing.status = MatchStatus::InProgress;
        let mut scored = playing.clone();
        scored.joined_score = Some(380);
        assert_eq!(
            diff(host, &playing, &scored),
            vec![LobbyEvent::OpponentScorePosted { score: 380 }]
        );
        // The opposite seat's own score is not an opponent event.
        assert!(diff(guest, &playing, &scored).is_empty());
    }

    #[test]
    fn finish_edge_fires_once() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut before = summary(host);
        before.joined_id = Some(guest);
        before.status = MatchStatus::InProgress;
        before.host_score = Some(420);
        before.joined_score = Some(380);
        let mut after = before.clone();
        after.status = MatchStatus::Finished;

        assert_eq!(diff(host, &before, &after), vec![LobbyEvent::Finished]);
        assert!(diff(host, &after, &after).is_empty());
    }
}
