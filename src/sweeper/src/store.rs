//! Object storage access used by the cleaner.
//!
//! The cleaner only needs two operations, a complete listing under a key
//! prefix and a single-object delete, so it talks to storage through the
//! [`BackupStore`] trait. [`ObjectStoreBackend`] implements it on top of any
//! [`ObjectStore`]; the bucket is fixed when that store is built.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;
use thiserror::Error;

/// Metadata of one listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full key inside the bucket.
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

/// Errors returned by a [`BackupStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to list objects under '{prefix}': {source}")]
    List {
        prefix: String,
        source: object_store::Error,
    },

    #[error("Failed to delete '{key}': {source}")]
    Delete {
        key: String,
        source: object_store::Error,
    },

    #[error("Invalid object key '{key}': {source}")]
    InvalidKey {
        key: String,
        source: object_store::path::Error,
    },
}

/// Storage capability consumed by the cleaner.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// List every object whose key starts with `prefix`.
    ///
    /// The result is complete; implementations follow pagination themselves.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError>;

    /// Delete a single object.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// [`BackupStore`] backed by an [`ObjectStore`].
pub struct ObjectStoreBackend {
    object_store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBackend {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self { object_store }
    }
}

#[async_trait]
impl BackupStore for ObjectStoreBackend {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StoreError> {
        // object_store lists whole path segments, so list the folder part and
        // match the rest of the prefix against each key
        let folder = prefix.rsplit_once('/').map(|(folder, _)| folder);
        let folder_path = folder
            .filter(|folder| !folder.is_empty())
            .map(ObjectPath::from);

        tracing::debug!(prefix = %prefix, folder = ?folder_path, "Listing objects");

        let mut objects = vec![];
        let mut list_stream = self.object_store.list(folder_path.as_ref());

        while let Some(meta_result) = list_stream.next().await {
            let meta = meta_result.map_err(|source| StoreError::List {
                prefix: prefix.to_string(),
                source,
            })?;

            let key = meta.location.to_string();
            if key.starts_with(prefix) {
                objects.push(StoredObject {
                    key,
                    size_bytes: meta.size,
                    last_modified: meta.last_modified,
                });
            }
        }

        tracing::debug!(prefix = %prefix, objects = objects.len(), "Listed objects");

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = ObjectPath::parse(key).map_err(|source| StoreError::InvalidKey {
            key: key.to_string(),
            source,
        })?;

        self.object_store
            .delete(&path)
            .await
            .map_err(|source| StoreError::Delete {
                key: key.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    async fn seeded(keys: &[&str]) -> Arc<InMemory> {
        let store = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(&ObjectPath::from(*key), b"archive".to_vec().into())
                .await
                .unwrap();
        }
        store
    }

    fn sorted_keys(objects: Vec<StoredObject>) -> Vec<String> {
        let mut keys: Vec<_> = objects.into_iter().map(|o| o.key).collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_list_filters_by_string_prefix() {
        let store = seeded(&[
            "nightly/backup-1.zip",
            "nightly/backup-2.zip",
            "nightly/other-1.zip",
            "nightly/deeper/backup-3.zip",
            "weekly/backup-4.zip",
            "backup-5.zip",
        ])
        .await;
        let backend = ObjectStoreBackend::new(store);

        let keys = sorted_keys(backend.list("nightly/backup").await.unwrap());
        assert_eq!(keys, vec!["nightly/backup-1.zip", "nightly/backup-2.zip"]);
    }

    #[tokio::test]
    async fn test_list_at_bucket_root() {
        let store = seeded(&["backup-1.zip", "nightly/backup-2.zip", "notes.txt"]).await;
        let backend = ObjectStoreBackend::new(store);

        let keys = sorted_keys(backend.list("backup").await.unwrap());
        assert_eq!(keys, vec!["backup-1.zip"]);
    }

    #[tokio::test]
    async fn test_list_reports_sizes() {
        let store = seeded(&["backup-1.zip"]).await;
        let backend = ObjectStoreBackend::new(store);

        let objects = backend.list("backup").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].size_bytes, 7);
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let store = seeded(&["nightly/backup-1.zip", "nightly/backup-2.zip"]).await;
        let backend = ObjectStoreBackend::new(store.clone());

        backend.delete("nightly/backup-1.zip").await.unwrap();

        let keys = sorted_keys(backend.list("nightly/").await.unwrap());
        assert_eq!(keys, vec!["nightly/backup-2.zip"]);
    }

    #[tokio::test]
    async fn test_delete_rejects_invalid_key() {
        let backend = ObjectStoreBackend::new(Arc::new(InMemory::new()));

        let err = backend.delete("nightly//backup.zip").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }
}
