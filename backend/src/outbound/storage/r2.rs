//! Cloudflare R2 adapter using the S3-compatible API.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload,
};
use tracing::debug;

use crate::domain::ObjectKey;
use crate::domain::ports::{BlobStore, StorageError, StoredObject};

/// Credentials and bucket for an R2 account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl R2Config {
    /// S3 endpoint for the account.
    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// [`BlobStore`] backed by an R2 bucket.
#[derive(Clone)]
pub struct R2BlobStore {
    store: Arc<AmazonS3>,
    bucket: String,
}

impl R2BlobStore {
    /// Build a client for `config`. No request is made until first use.
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] when the client cannot be built.
    pub fn new(config: &R2Config) -> Result<Self, StorageError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(config.endpoint())
            .with_region("auto")
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .build()
            .map_err(|err| StorageError::unavailable(err.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    fn path(key: &ObjectKey) -> Result<Path, StorageError> {
        Path::parse(key.as_ref()).map_err(|err| StorageError::write(err.to_string()))
    }
}

fn map_read_error(key: &ObjectKey, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::not_found(key.as_ref()),
        object_store::Error::Unauthenticated { .. }
        | object_store::Error::PermissionDenied { .. } => {
            StorageError::unavailable(err.to_string())
        }
        other => StorageError::read(other.to_string()),
    }
}

#[async_trait]
impl BlobStore for R2BlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_owned()),
        );
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };
        self.store
            .put_opts(&Self::path(key)?, PutPayload::from(bytes), options)
            .await
            .map_err(|err| StorageError::write(err.to_string()))?;
        debug!(bucket = %self.bucket, key = %key, "stored object in R2");
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let result = self
            .store
            .get(&Self::path(key)?)
            .await
            .map_err(|err| map_read_error(key, err))?;
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.as_ref().to_owned());
        let bytes = result
            .bytes()
            .await
            .map_err(|err| map_read_error(key, err))?;
        Ok(StoredObject {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        match self.store.delete(&Self::path(key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(StorageError::write(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config() -> R2Config {
        R2Config {
            account_id: "abc123".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            bucket: "digidiploma".into(),
        }
    }

    #[rstest]
    fn endpoint_is_account_scoped() {
        assert_eq!(config().endpoint(), "https://abc123.r2.cloudflarestorage.com");
    }

    #[rstest]
    fn builds_without_network_access() {
        assert!(R2BlobStore::new(&config()).is_ok());
    }

    #[rstest]
    fn not_found_keeps_the_key() {
        let key = ObjectKey::parse("materials/x.pdf").expect("key");
        let err = map_read_error(
            &key,
            object_store::Error::NotFound {
                path: "materials/x.pdf".into(),
                source: "missing".into(),
            },
        );
        assert_eq!(err, StorageError::not_found("materials/x.pdf"));
    }
}
