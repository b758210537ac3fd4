//! Port abstraction for object storage backends (R2, local disk).
//!
//! Keys are already validated [`ObjectKey`]s, so adapters never see paths
//! that could escape their root.
use async_trait::async_trait;

use crate::domain::ObjectKey;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum StorageError {
        /// No object exists under the key.
        NotFound { key: String } => "object not found: {key}",
        /// The backend could not be reached or refused credentials.
        Unavailable { message: String } => "storage backend unavailable: {message}",
        /// Writing or deleting the object failed.
        Write { message: String } => "storage write failed: {message}",
        /// Reading the object failed.
        Read { message: String } => "storage read failed: {message}",
    }
}

/// Object body and the content type recorded when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Port for a key/value blob store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Read the object stored under `key`.
    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    /// Remove the object. Missing objects are not an error.
    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError>;
}
