//! Local-disk blob store rooted at the upload directory.
//!
//! All filesystem access goes through a capability handle on the root, so a
//! key can never reach outside it even if validation were bypassed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::ObjectKey;
use crate::domain::ports::{BlobStore, StorageError, StoredObject};

/// [`BlobStore`] writing beneath a single directory.
#[derive(Clone)]
pub struct LocalBlobStore {
    root: Arc<Dir>,
    root_path: PathBuf,
}

impl LocalBlobStore {
    /// Open (creating if needed) the directory at `root`.
    ///
    /// # Errors
    /// Returns the I/O error when the directory cannot be created or opened.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root_path = root.as_ref().to_path_buf();
        Dir::create_ambient_dir_all(&root_path, ambient_authority())?;
        let dir = Dir::open_ambient_dir(&root_path, ambient_authority())?;
        Ok(Self {
            root: Arc::new(dir),
            root_path,
        })
    }

    /// Directory backing the store, used to serve `/uploads`.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, StorageError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|err| StorageError::unavailable(err.to_string()))?
    }
}

fn parent_of(key: &str) -> Option<&str> {
    key.rsplit_once('/').map(|(parent, _)| parent)
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let key = key.as_ref().to_owned();
        self.blocking(move |root| {
            if let Some(parent) = parent_of(&key) {
                root.create_dir_all(parent)
                    .map_err(|err| StorageError::write(err.to_string()))?;
            }
            root.write(&key, &bytes)
                .map_err(|err| StorageError::write(err.to_string()))?;
            debug!(key = %key, "wrote local object");
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let key = key.as_ref().to_owned();
        self.blocking(move |root| match root.read(&key) {
            Ok(bytes) => Ok(StoredObject {
                bytes,
                content_type: None,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(err) => Err(StorageError::read(err.to_string())),
        })
        .await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        let key = key.as_ref().to_owned();
        self.blocking(move |root| match root.remove_file(&key) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::write(err.to_string())),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        store: LocalBlobStore,
    }

    #[fixture]
    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = LocalBlobStore::open(dir.path().join("uploads")).expect("open store");
        Harness { _dir: dir, store }
    }

    fn key(raw: &str) -> ObjectKey {
        ObjectKey::parse(raw).expect("valid key")
    }

    #[rstest]
    #[tokio::test]
    async fn writes_nested_keys_and_reads_them_back(harness: Harness) {
        let key = key("materials/1700000000000-abcd1234-notes.pdf");
        harness
            .store
            .put(&key, b"%PDF".to_vec(), "application/pdf")
            .await
            .expect("put");

        let object = harness.store.get(&key).await.expect("get");
        assert_eq!(object.bytes, b"%PDF");
        assert!(
            harness
                .store
                .root_path()
                .join("materials/1700000000000-abcd1234-notes.pdf")
                .exists()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn missing_objects_are_not_found(harness: Harness) {
        let err = harness.store.get(&key("avatars/none.png")).await.expect_err("missing");
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_twice_is_harmless(harness: Harness) {
        let key = key("resumes/cv.pdf");
        harness.store.put(&key, vec![1, 2, 3], "application/pdf").await.expect("put");
        harness.store.delete(&key).await.expect("first delete");
        harness.store.delete(&key).await.expect("second delete");
        assert!(harness.store.get(&key).await.is_err());
    }
}
