//! Key-value document store for per-user records.
//!
//! Documents are JSON values addressed by `(collection, key)`. Two backends
//! ship with the crate:
//!
//! - [`MemoryStore`]: a `Mutex<HashMap>`, for tests and throwaway servers.
//! - [`FileStore`]: one pretty-printed JSON file per document.
//!
//! ```text
//! root/
//!   users/
//!     user-123.json
//!   settings/
//!     user-123.json
//! ```
//!
//! The only invariant is key uniqueness within a collection: `set` replaces.

pub mod account;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::StoreError;

/// Maximum length of a document key.
pub const MAX_KEY_LEN: usize = 128;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Get/set access to JSON documents.
pub trait DocumentStore: Send + Sync {
    /// Read a document; `None` if it was never written.
    fn get<'a>(&'a self, collection: &'a str, key: &'a str)
    -> StoreFuture<'a, Option<serde_json::Value>>;

    /// Create or replace a document.
    fn set<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        value: serde_json::Value,
    ) -> StoreFuture<'a, ()>;
}

/// Check that `key` is safe to use as a document key (and a file name).
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Both backends accept the same `(collection, key)` pairs.
fn validate_address(collection: &str, key: &str) -> Result<(), StoreError> {
    validate_key(collection)?;
    validate_key(key)
}

// ── MemoryStore ────────────────────────────────────────────────────

/// In-process store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn get<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
    ) -> StoreFuture<'a, Option<serde_json::Value>> {
        Box::pin(async move {
            validate_address(collection, key)?;
            let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
            Ok(docs
                .get(&(collection.to_string(), key.to_string()))
                .cloned())
        })
    }

    fn set<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        value: serde_json::Value,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            validate_address(collection, key)?;
            let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
            docs.insert((collection.to_string(), key.to_string()), value);
            Ok(())
        })
    }
}

// ── FileStore ──────────────────────────────────────────────────────

/// Store backed by a directory of JSON files.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_address(collection, key)?;
        Ok(self.root.join(collection).join(format!("{key}.json")))
    }
}

impl DocumentStore for FileStore {
    fn get<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
    ) -> StoreFuture<'a, Option<serde_json::Value>> {
        Box::pin(async move {
            let path = self.path_for(collection, key)?;
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(t) => t,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(source) => return Err(StoreError::Io { path, source }),
            };
            let value = serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                collection: collection.to_string(),
                key: key.to_string(),
                source,
            })?;
            Ok(Some(value))
        })
    }

    fn set<'a>(
        &'a self,
        collection: &'a str,
        key: &'a str,
        value: serde_json::Value,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_for(collection, key)?;
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?;
            }
            let json = serde_json::to_string_pretty(&value).map_err(StoreError::Encode)?;

            // Write to a sibling temp file and rename so readers never see a
            // half-written document.
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, json)
                .await
                .map_err(|source| StoreError::Io {
                    path: tmp.clone(),
                    source,
                })?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!("Stored {collection}/{key} at {}", path.display());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_validation() {
        assert!(validate_key("user-123").is_ok());
        assert!(validate_key("auth0|abc").is_err());
        assert!(validate_key("alice@example.com").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn memory_store_set_replaces() {
        let store = MemoryStore::new();
        assert!(store.get("users", "u1").await.unwrap().is_none());

        store.set("users", "u1", json!({"v": 1})).await.unwrap();
        store.set("users", "u1", json!({"v": 2})).await.unwrap();
        store.set("settings", "u1", json!({"v": 3})).await.unwrap();

        assert_eq!(store.get("users", "u1").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn backends_reject_the_same_collections() {
        let dir = tempfile::tempdir().unwrap();
        let stores: [Box<dyn DocumentStore>; 2] =
            [Box::new(MemoryStore::new()), Box::new(FileStore::new(dir.path()))];

        for store in &stores {
            for collection in ["", "..", "users/admin"] {
                assert!(matches!(
                    store.set(collection, "u1", json!({})).await,
                    Err(StoreError::InvalidKey(_))
                ));
                assert!(matches!(
                    store.get(collection, "u1").await,
                    Err(StoreError::InvalidKey(_))
                ));
            }
        }
    }

    #[tokio::test]
    async fn file_store_round_trips_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.get("users", "u1").await.unwrap().is_none());
        store
            .set("users", "u1", json!({"email": "a@example.com"}))
            .await
            .unwrap();

        assert!(dir.path().join("users").join("u1.json").exists());
        assert!(!dir.path().join("users").join("u1.json.tmp").exists());
        assert_eq!(
            store.get("users", "u1").await.unwrap(),
            Some(json!({"email": "a@example.com"}))
        );

        // A second store over the same directory sees the same data.
        let reopened = FileStore::new(dir.path());
        assert!(reopened.get("users", "u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn file_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = store.set("users", "../escape", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("users")).unwrap();
        std::fs::write(dir.path().join("users").join("u1.json"), "{not json").unwrap();

        let store = FileStore::new(dir.path());
        let err = store.get("users", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
