use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    match_store::MatchStore,
    models::{MatchEntity, MatchGuard, MatchPatch, MatchStatus},
    storage::{StorageError, StorageResult},
};

/// In-memory `MatchStore` used by tests and storage-less local runs.
///
/// Guarded writes lean on DashMap's per-shard locking: `get_mut` holds the
/// shard lock for the whole read-check-write, so guard evaluation and the
/// multi-field patch form a single atomic step. A secondary code registry
/// enforces game-code uniqueness among live records.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: DashMap<Uuid, MatchEntity>,
    codes: DashMap<String, Uuid>,
}

impl MemoryInner {
    fn insert(&self, record: MatchEntity) -> StorageResult<()> {
        match self.codes.entry(record.game_code.clone()) {
            Entry::Occupied(_) => Err(StorageError::code_conflict(record.game_code)),
            Entry::Vacant(slot) => {
                slot.insert(record.id);
                self.records.insert(record.id, record);
                Ok(())
            }
        }
    }

    fn update(&self, id: Uuid, guard: &MatchGuard, patch: &MatchPatch) -> bool {
        let Some(mut record) = self.records.get_mut(&id) else {
            return false;
        };
        if !guard.matches(&record) {
            return false;
        }
        patch.apply_to(&mut record);
        record.updated_at = SystemTime::now();
        true
    }

    fn delete(&self, id: Uuid, guard: &MatchGuard) -> bool {
        let removed = self.records.remove_if(&id, |_, record| guard.matches(record));
        match removed {
            Some((_, record)) => {
                self.codes.remove(&record.game_code);
                true
            }
            None => false,
        }
    }

    fn delete_matching(&self, condition: impl Fn(&MatchEntity) -> bool) -> u64 {
        let candidates: Vec<Uuid> = self
            .records
            .iter()
            .filter(|entry| condition(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let mut deleted = 0;
        for id in candidates {
            // Re-check under the shard lock; the record may have moved on
            // between the scan and the removal.
            if let Some((_, record)) = self.records.remove_if(&id, |_, record| condition(record)) {
                self.codes.remove(&record.game_code);
                deleted += 1;
            }
        }
        deleted
    }
}

impl MatchStore for MemoryMatchStore {
    fn insert_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert(record) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.records.get(&id).map(|entry| entry.clone())) })
    }

    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(id) = store.inner.codes.get(&code).map(|entry| *entry.value()) else {
                return Ok(None);
            };
            Ok(store.inner.records.get(&id).map(|entry| entry.clone()))
        })
    }

    fn update_match(
        &self,
        id: Uuid,
        guard: MatchGuard,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.update(id, &guard, &patch)) })
    }

    fn delete_match(&self, id: Uuid, guard: MatchGuard) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.delete(id, &guard)) })
    }

    fn delete_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .delete_matching(move |record| {
                    record.status == MatchStatus::Waiting && record.expires_at <= now
                }))
        })
    }

    fn delete_inactive(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.delete_matching(move |record| record.updated_at < cutoff)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
