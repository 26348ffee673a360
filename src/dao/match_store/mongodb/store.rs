use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, doc_id, guard_filter, patch_update},
};
use crate::dao::{
    match_store::MatchStore,
    models::{MatchEntity, MatchGuard, MatchPatch},
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";

/// MongoDB-backed implementation of [`MatchStore`].
///
/// Guarded conditional writes are expressed as `update_one`/`delete_one`
/// calls whose filter carries the guard; a zero `matched_count` is the
/// "state moved on" signal.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == 11_000
    )
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;

        // Uniqueness of the join token among live records; deletions free the
        // code for reuse.
        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"game_code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        collection
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "game_code",
                source,
            })?;

        // The expire sweep scans (status, expires_at); the inactive sweep
        // scans updated_at.
        let expiry_index = mongodb::IndexModel::builder()
            .keys(doc! {"status": 1, "expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_expiry_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(expiry_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "status,expires_at",
                source,
            })?;

        let activity_index = mongodb::IndexModel::builder()
            .keys(doc! {"updated_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_activity_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(activity_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "updated_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn insert_match(&self, record: MatchEntity) -> MongoResult<()> {
        let id = record.id;
        let code = record.game_code.clone();
        let document: MongoMatchDocument = record.into();
        let collection = self.collection().await;
        collection.insert_one(&document).await.map_err(|source| {
            if is_duplicate_key(&source) {
                MongoDaoError::DuplicateCode { code }
            } else {
                MongoDaoError::InsertMatch { id, source }
            }
        })?;
        Ok(())
    }

    async fn find_match(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_by_code(&self, code: String) -> MongoResult<Option<MatchEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc! {"game_code": &code})
            .await
            .map_err(|source| MongoDaoError::LoadByCode { code, source })?;
        Ok(document.map(Into::into))
    }

    async fn update_match(
        &self,
        id: Uuid,
        guard: MatchGuard,
        patch: MatchPatch,
    ) -> MongoResult<bool> {
        let collection = self.collection().await;
        let outcome = collection
            .update_one(guard_filter(id, &guard), patch_update(&patch))
            .await
            .map_err(|source| MongoDaoError::UpdateMatch { id, source })?;
        Ok(outcome.matched_count > 0)
    }

    async fn delete_match(&self, id: Uuid, guard: MatchGuard) -> MongoResult<bool> {
        let collection = self.collection().await;
        let outcome = collection
            .delete_one(guard_filter(id, &guard))
            .await
            .map_err(|source| MongoDaoError::DeleteMatch { id, source })?;
        Ok(outcome.deleted_count > 0)
    }

    async fn delete_expired(&self, now: SystemTime) -> MongoResult<u64> {
        let collection = self.collection().await;
        let outcome = collection
            .delete_many(doc! {
                "status": "waiting",
                "expires_at": doc! {"$lte": DateTime::from_system_time(now)},
            })
            .await
            .map_err(|source| MongoDaoError::Sweep { source })?;
        Ok(outcome.deleted_count)
    }

    async fn delete_inactive(&self, cutoff: SystemTime) -> MongoResult<u64> {
        let collection = self.collection().await;
        let outcome = collection
            .delete_many(doc! {
                "updated_at": doc! {"$lt": DateTime::from_system_time(cutoff)},
            })
            .await
            .map_err(|source| MongoDaoError::Sweep { source })?;
        Ok(outcome.deleted_count)
    }
}

impl MatchStore for MongoMatchStore {
    fn insert_match(&self, record: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(record).await.map_err(Into::into) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_by_code(code).await.map_err(Into::into) })
    }

    fn update_match(
        &self,
        id: Uuid,
        guard: MatchGuard,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.update_match(id, guard, patch).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: Uuid, guard: MatchGuard) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_match(id, guard).await.map_err(Into::into) })
    }

    fn delete_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.delete_expired(now).await.map_err(Into::into) })
    }

    fn delete_inactive(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.delete_inactive(cutoff).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
