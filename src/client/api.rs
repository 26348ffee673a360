use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dto::{
        common::ActionResponse,
        lobby::{CreateLobbyRequest, LobbyPreview, LobbySummary, UpdateSettingsRequest},
        score::{ScoreBoard, ScoreSubmission},
    },
    routes::participant::PARTICIPANT_ID_HEADER,
};

/// Result alias for API client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the typed API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with an error status.
    #[error("server answered {status}: {message}")]
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Server-provided error message.
        message: String,
    },
}

impl ClientError {
    /// HTTP status of an API-level failure, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Typed HTTP client for the lobby and score endpoints, bound to one
/// participant identity.
#[derive(Clone)]
pub struct LobbyClient {
    http: reqwest::Client,
    base_url: String,
    participant_id: Uuid,
}

impl LobbyClient {
    /// Build a client for `participant_id` against a backend at `base_url`.
    pub fn new(base_url: impl Into<String>, participant_id: Uuid) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            participant_id,
        }
    }

    /// Identity this client authenticates as.
    pub fn participant_id(&self) -> Uuid {
        self.participant_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        let response = request
            .header(PARTICIPANT_ID_HEADER, self.participant_id.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    /// Open a new lobby.
    pub async fn create_lobby(&self, request: &CreateLobbyRequest) -> ClientResult<LobbySummary> {
        self.execute(self.http.post(self.url("/lobbies")).json(request))
            .await
    }

    /// Public-safe preview of a lobby by its game code.
    pub async fn preview(&self, code: &str) -> ClientResult<LobbyPreview> {
        self.execute(self.http.get(self.url(&format!("/lobbies/code/{code}"))))
            .await
    }

    /// Join a waiting lobby by its game code.
    pub async fn join(&self, code: &str) -> ClientResult<LobbySummary> {
        self.execute(
            self.http
                .post(self.url(&format!("/lobbies/code/{code}/join"))),
        )
        .await
    }

    /// Re-read the match record; the poller calls this on its cadence.
    pub async fn lobby(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.execute(self.http.get(self.url(&format!("/lobbies/{id}"))))
            .await
    }

    /// Replace the quiz settings (host only, pre-start).
    pub async fn update_settings(
        &self,
        id: Uuid,
        request: &UpdateSettingsRequest,
    ) -> ClientResult<LobbySummary> {
        self.execute(
            self.http
                .patch(self.url(&format!("/lobbies/{id}/settings")))
                .json(request),
        )
        .await
    }

    /// Accept the joined participant (host only).
    pub async fn accept(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "accept").await
    }

    /// Reject the joined participant (host only).
    pub async fn reject(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "reject").await
    }

    /// Remove the joined participant (host only).
    pub async fn kick(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "kick").await
    }

    /// Declare readiness (joined participant only).
    pub async fn ready(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "ready").await
    }

    /// Start the match (host only).
    pub async fn start(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "start").await
    }

    /// Rewind the match for a rematch (host only).
    pub async fn reset(&self, id: Uuid) -> ClientResult<LobbySummary> {
        self.post_action(id, "reset").await
    }

    /// Leave the lobby.
    pub async fn leave(&self, id: Uuid) -> ClientResult<ActionResponse> {
        self.execute(self.http.post(self.url(&format!("/lobbies/{id}/leave"))))
            .await
    }

    /// Submit the caller's final score for their seat.
    pub async fn submit_score(
        &self,
        id: Uuid,
        submission: &ScoreSubmission,
    ) -> ClientResult<ScoreBoard> {
        self.execute(
            self.http
                .post(self.url(&format!("/lobbies/{id}/score")))
                .json(submission),
        )
        .await
    }

    /// Read the aggregated scores.
    pub async fn scores(&self, id: Uuid) -> ClientResult<ScoreBoard> {
        self.execute(self.http.get(self.url(&format!("/lobbies/{id}/score"))))
            .await
    }

    async fn post_action(&self, id: Uuid, action: &str) -> ClientResult<LobbySummary> {
        self.execute(
            self.http
                .post(self.url(&format!("/lobbies/{id}/{action}"))),
        )
        .await
    }
}
