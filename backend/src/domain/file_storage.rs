//! File storage service choosing between R2 and local disk.
//!
//! Uploads go to R2 when it is configured and fall back to local disk when the
//! remote write fails, unless remote storage is forced. Deletion works from
//! the public URL recorded on the owning document, so callers never need to
//! remember which backend held a file.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{BlobStore, StorageError, StoredObject};
use crate::domain::{
    Error, ObjectKey, StorageAddressing, StorageBackend, StorageLocation, StoredFile,
};

/// A file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl FileUpload {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Storage facade used by every service that accepts files.
#[derive(Clone)]
pub struct FileStorage {
    remote: Option<Arc<dyn BlobStore>>,
    local: Arc<dyn BlobStore>,
    addressing: StorageAddressing,
    force_remote: bool,
    clock: Arc<dyn Clock>,
}

impl FileStorage {
    /// Create the facade. `remote` is `None` when R2 is not configured.
    pub fn new(
        remote: Option<Arc<dyn BlobStore>>,
        local: Arc<dyn BlobStore>,
        addressing: StorageAddressing,
        force_remote: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            remote,
            local,
            addressing,
            force_remote,
            clock,
        }
    }

    /// Whether uploads target R2.
    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Store `upload` under `folder` and describe where it went.
    pub async fn upload(&self, upload: FileUpload, folder: &str) -> Result<StoredFile, Error> {
        let key = ObjectKey::generate(
            folder,
            &upload.file_name,
            self.clock.utc().timestamp_millis(),
            &upload_nonce(),
        );
        let size = upload.size();
        let FileUpload {
            bytes,
            file_name,
            content_type,
        } = upload;

        let backend = match &self.remote {
            Some(remote) => match remote.put(&key, bytes.clone(), &content_type).await {
                Ok(()) => StorageBackend::R2,
                Err(err) if self.force_remote => {
                    return Err(map_storage_error(err));
                }
                Err(err) => {
                    warn!(error = %err, key = %key, "R2 upload failed; falling back to local disk");
                    self.local
                        .put(&key, bytes, &content_type)
                        .await
                        .map_err(map_storage_error)?;
                    StorageBackend::Local
                }
            },
            None => {
                self.local
                    .put(&key, bytes, &content_type)
                    .await
                    .map_err(map_storage_error)?;
                StorageBackend::Local
            }
        };

        let url = match backend {
            StorageBackend::R2 => self.addressing.proxy_url(&key),
            StorageBackend::Local => StorageAddressing::local_url(&key),
        };
        info!(key = %key, backend = ?backend, size, "stored upload");
        Ok(StoredFile {
            url,
            key,
            backend,
            size,
            content_type,
            original_name: file_name,
        })
    }

    /// Delete the object behind `url`. Unrecognised URLs are ignored.
    pub async fn delete(&self, url: &str) -> Result<(), Error> {
        match self.addressing.locate(url) {
            StorageLocation::Remote(key) => match &self.remote {
                Some(remote) => remote.delete(&key).await.map_err(map_storage_error),
                None => {
                    warn!(key = %key, "cannot delete R2 object: R2 is not configured");
                    Ok(())
                }
            },
            StorageLocation::Local(key) => {
                self.local.delete(&key).await.map_err(map_storage_error)
            }
            StorageLocation::Unrecognised => {
                info!(url, "skipping deletion of unmanaged file URL");
                Ok(())
            }
        }
    }

    /// Delete without failing the caller; errors are logged.
    pub async fn delete_quietly(&self, url: &str) {
        if let Err(err) = self.delete(url).await {
            warn!(error = %err, url, "failed to delete stored file");
        }
    }

    /// Read an object for the proxy endpoint.
    pub async fn fetch(&self, key: &ObjectKey) -> Result<StoredObject, Error> {
        let Some(remote) = &self.remote else {
            return Err(Error::not_found("file not found"));
        };
        remote.get(key).await.map_err(map_storage_error)
    }
}

fn map_storage_error(err: StorageError) -> Error {
    match err {
        StorageError::NotFound { .. } => Error::not_found("file not found"),
        StorageError::Unavailable { message } => {
            warn!(error = %message, "storage backend unavailable");
            Error::service_unavailable("file storage unavailable")
        }
        other => Error::internal(other.to_string()),
    }
}

/// Eight hex characters keeping same-millisecond uploads apart.
fn upload_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}
