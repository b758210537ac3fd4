//! Connection setup and index management.

use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use tracing::info;

/// Errors raised while connecting or preparing the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MongoError {
    /// The URI could not be parsed or the client could not be built.
    #[error("invalid MongoDB configuration: {message}")]
    Config { message: String },
    /// The server did not answer a ping.
    #[error("MongoDB unreachable: {message}")]
    Unreachable { message: String },
    /// An index could not be created.
    #[error("failed to create index on {collection}: {message}")]
    Index { collection: String, message: String },
}

impl MongoError {
    fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

/// Connection settings.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use digidiploma::outbound::mongo::MongoConfig;
///
/// let config = MongoConfig::new("mongodb://localhost:27017", "digidiploma")
///     .with_max_pool_size(20)
///     .with_server_selection_timeout(Duration::from_secs(5));
/// assert_eq!(config.database(), "digidiploma");
/// ```
#[derive(Debug, Clone)]
pub struct MongoConfig {
    uri: String,
    database: String,
    max_pool_size: u32,
    server_selection_timeout: Duration,
}

impl MongoConfig {
    /// Defaults: pool of 10, 10 second server selection timeout.
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            max_pool_size: 10,
            server_selection_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_pool_size(mut self, max_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Handle to the application database. Cheap to clone.
#[derive(Clone, Debug)]
pub struct MongoDatabase {
    db: Database,
}

impl MongoDatabase {
    /// Build the client and ping the server once.
    pub async fn connect(config: &MongoConfig) -> Result<Self, MongoError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|err| MongoError::config(err.to_string()))?;
        options.app_name = Some("digidiploma".to_owned());
        options.max_pool_size = Some(config.max_pool_size);
        options.server_selection_timeout = Some(config.server_selection_timeout);
        let client =
            Client::with_options(options).map_err(|err| MongoError::config(err.to_string()))?;
        let db = client.database(&config.database);
        let this = Self { db };
        this.ping().await?;
        info!(database = %config.database, "connected to MongoDB");
        Ok(this)
    }

    /// Round-trip used by the readiness probe.
    pub async fn ping(&self) -> Result<(), MongoError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(drop)
            .map_err(|err| MongoError::unreachable(err.to_string()))
    }

    pub(crate) fn collection<T: Send + Sync>(&self, name: &str) -> mongodb::Collection<T> {
        self.db.collection(name)
    }

    /// Create the unique and lookup indexes the repositories rely on.
    pub async fn ensure_indexes(&self) -> Result<(), MongoError> {
        let unique = || IndexOptions::builder().unique(true).build();
        let sparse_unique = || IndexOptions::builder().unique(true).sparse(true).build();
        let plan: [(&str, Document, Option<IndexOptions>); 13] = [
            ("users", doc! { "email": 1 }, Some(unique())),
            ("users", doc! { "passwordReset.tokenHash": 1 }, Some(IndexOptions::builder().sparse(true).build())),
            ("subjects", doc! { "code": 1, "branchKey": 1 }, Some(unique())),
            ("materials", doc! { "subjectCode": 1, "branch": 1, "semester": 1 }, None),
            ("materials", doc! { "createdAt": -1 }, None),
            ("notices", doc! { "isActive": 1, "createdAt": -1 }, None),
            ("payments", doc! { "gatewayOrderId": 1 }, Some(sparse_unique())),
            ("payments", doc! { "userId": 1, "status": 1 }, None),
            ("subscriptions", doc! { "userId": 1, "createdAt": -1 }, None),
            ("subscriptions", doc! { "paymentOrderId": 1 }, None),
            ("notifications", doc! { "recipient": 1, "createdAt": -1 }, None),
            ("projects", doc! { "studentId": 1 }, None),
            ("logs", doc! { "action": 1, "createdAt": -1 }, None),
        ];
        for (collection, keys, options) in plan {
            let model = IndexModel::builder().keys(keys).options(options).build();
            self.db
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|err| MongoError::Index {
                    collection: collection.to_owned(),
                    message: err.to_string(),
                })?;
        }
        Ok(())
    }
}
