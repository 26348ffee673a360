use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use super::CollabResult;

/// Contract to the external identity provider.
///
/// Caller authentication happens upstream of this backend; the only thing
/// the match subsystem ever asks the provider is a display name.
pub trait IdentityProvider: Send + Sync {
    /// Resolve the display name of a participant, `None` when unknown.
    fn display_name(&self, participant: Uuid) -> BoxFuture<'static, CollabResult<Option<String>>>;
}

/// Fixed directory of display names, used in tests and setups without a
/// reachable identity service.
#[derive(Clone, Default)]
pub struct StaticIdentityProvider {
    names: Arc<DashMap<Uuid, String>>,
}

impl StaticIdentityProvider {
    /// Register a display name.
    pub fn insert(&self, participant: Uuid, name: impl Into<String>) {
        self.names.insert(participant, name.into());
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn display_name(&self, participant: Uuid) -> BoxFuture<'static, CollabResult<Option<String>>> {
        let names = self.names.clone();
        Box::pin(async move { Ok(names.get(&participant).map(|entry| entry.clone())) })
    }
}

#[cfg(feature = "client")]
pub use http::HttpIdentityProvider;

#[cfg(feature = "client")]
mod http {
    use futures::future::BoxFuture;
    use serde::Deserialize;
    use uuid::Uuid;

    use crate::collab::{CollabError, CollabResult};

    use super::IdentityProvider;

    /// HTTP-backed identity provider.
    #[derive(Clone)]
    pub struct HttpIdentityProvider {
        http: reqwest::Client,
        base_url: String,
    }

    #[derive(Deserialize)]
    struct ParticipantProfile {
        display_name: String,
    }

    impl HttpIdentityProvider {
        /// Build a provider rooted at `base_url`.
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                http: reqwest::Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_owned(),
            }
        }
    }

    impl IdentityProvider for HttpIdentityProvider {
        fn display_name(
            &self,
            participant: Uuid,
        ) -> BoxFuture<'static, CollabResult<Option<String>>> {
            let http = self.http.clone();
            let url = format!("{}/participants/{participant}", self.base_url);
            Box::pin(async move {
                let response = http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|err| CollabError::Unreachable(err.to_string()))?;

                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                let profile: ParticipantProfile = response
                    .error_for_status()
                    .map_err(|err| CollabError::Unreachable(err.to_string()))?
                    .json()
                    .await
                    .map_err(|err| CollabError::Malformed(err.to_string()))?;

                Ok(Some(profile.display_name))
            })
        }
    }
}
