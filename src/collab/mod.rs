//! Narrow contracts to the external collaborators the match subsystem
//! consumes: the identity provider and the vocabulary content store.

/// Identity provider contract and implementations.
pub mod identity;
/// Vocabulary content store contract and implementations.
pub mod questions;

use thiserror::Error;

/// Result alias for collaborator calls.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors surfaced by external collaborators.
#[derive(Debug, Error)]
pub enum CollabError {
    /// The collaborator could not be reached.
    #[error("collaborator unreachable: {0}")]
    Unreachable(String),
    /// The collaborator answered with data this crate cannot interpret.
    #[error("collaborator returned malformed data: {0}")]
    Malformed(String),
}
