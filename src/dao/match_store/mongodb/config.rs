use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

/// Database used when the deployment does not name one.
const DEFAULT_DATABASE_NAME: &str = "word_clash";

/// Connection settings for the MongoDB match store.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed client options.
    pub options: ClientOptions,
    /// Database the match collection lives in.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection URI, defaulting the database name when omitted.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DATABASE_NAME).to_owned(),
        })
    }
}
