use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for the MongoDB backend.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB match store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert match `{id}`")]
    InsertMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("game code `{code}` already in use")]
    DuplicateCode { code: String },
    #[error("failed to load match `{id}`")]
    LoadMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load match by code `{code}`")]
    LoadByCode {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update match `{id}`")]
    UpdateMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete match `{id}`")]
    DeleteMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("sweep deletion failed")]
    Sweep {
        #[source]
        source: MongoError,
    },
}
