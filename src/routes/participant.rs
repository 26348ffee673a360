use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the opaque participant id asserted by the fronting auth
/// layer. Identity verification is that layer's job; this backend only
/// requires the id to be present and well-formed.
pub const PARTICIPANT_ID_HEADER: &str = "x-participant-id";

/// Caller identity extracted from the request headers.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Uuid);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(PARTICIPANT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing participant identity".into()))?;

        let id = raw
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized("malformed participant identity".into()))?;

        Ok(Self(id))
    }
}
