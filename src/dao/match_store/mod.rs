pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{MatchEntity, MatchGuard, MatchPatch};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for match records.
///
/// `update_match` and `delete_match` are guarded conditional writes: the
/// guard is evaluated against the stored record in the same atomic step as
/// the mutation, and a `false` return means the precondition no longer held
/// (the state moved under the caller). This is the only concurrency
/// primitive the lobby subsystem relies on.
pub trait MatchStore: Send + Sync {
    /// Insert a fresh record. Fails with `CodeConflict` when the game code is
    /// already held by a live record.
    fn insert_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look a record up by its primary key.
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Look a record up by its game code.
    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Apply `patch` to the record iff `guard` still matches it, atomically.
    /// Implementations stamp `updated_at` on every applied write.
    fn update_match(
        &self,
        id: Uuid,
        guard: MatchGuard,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete the record iff `guard` still matches it.
    fn delete_match(&self, id: Uuid, guard: MatchGuard) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete every record still `Waiting` whose `expires_at` has passed.
    /// Must never touch records in any other status.
    fn delete_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<u64>>;
    /// Delete every record, regardless of status, not updated since `cutoff`.
    fn delete_inactive(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>>;
    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a broken backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
