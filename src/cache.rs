//! Local key-value storage behind the solar and forecast caches.
//!
//! [`FjallStore`] persists to disk, [`MemoryKeyValueStore`] lives for the process, and
//! [`FallbackStore`] combines them so callers never see a storage failure.

use anyhow::Result;
use async_trait::async_trait;
use fjall::Keyspace;
use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

/// Byte-oriented store keyed by string
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Shared handle to any store
pub type SharedStore = Arc<dyn KeyValueStore>;

pub struct FjallStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("rahukaal", fjall::KeyspaceCreateOptions::default)?;
        Ok(FjallStore { store: items })
    }
}

#[async_trait]
impl KeyValueStore for FjallStore {
    #[tracing::instrument(name = "query_store", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();
        let value = task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;
        if value.is_none() {
            debug!("Key not found");
        }
        Ok(value)
    }

    #[tracing::instrument(name = "put_store", level = "debug", skip(self, value))]
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, value)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.items.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// Durable store with a silent in-memory fallback.
///
/// Reads that fail or miss on the durable side consult memory; writes that fail there land in
/// memory instead. No operation of this store ever returns an error.
pub struct FallbackStore {
    primary: Option<SharedStore>,
    memory: MemoryKeyValueStore,
}

impl FallbackStore {
    #[must_use]
    pub fn new(primary: Option<SharedStore>) -> Self {
        Self {
            primary,
            memory: MemoryKeyValueStore::new(),
        }
    }

    /// Memory only, used when persistence is disabled
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Open the durable store at `path`, degrading to memory if that fails
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match FjallStore::open(path) {
            Ok(store) => Self::new(Some(Arc::new(store))),
            Err(e) => {
                warn!(
                    "Failed to open cache database at {}: {e}. Using in-memory cache",
                    path.display()
                );
                Self::in_memory()
            }
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.primary.is_some()
    }
}

#[async_trait]
impl KeyValueStore for FallbackStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(primary) = &self.primary {
            match primary.get(key).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => warn!("Store read failed for {key}: {e}"),
            }
        }
        self.memory.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if let Some(primary) = &self.primary {
            match primary.put(key, value.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Store write failed for {key}, keeping it in memory: {e}"),
            }
        }
        self.memory.put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.remove(key).await {
                warn!("Store remove failed for {key}: {e}");
            }
        }
        self.memory.remove(key).await
    }
}

/// Read and decode a JSON value. Missing, unreadable and corrupt entries all read as `None`.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let bytes = match store.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!("Cache read failed for {key}: {e}");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding unreadable cache entry {key}: {e}");
            None
        }
    }
}

/// Encode and write a JSON value. Failures are logged and swallowed.
pub async fn put_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to encode cache entry {key}: {e}");
            return;
        }
    };
    if let Err(e) = store.put(key, bytes).await {
        warn!("Cache write failed for {key}: {e}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::TempDir;

    /// Store whose every operation fails
    pub(crate) struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow!("storage unavailable"))
        }

        async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("storage unavailable"))
        }
    }

    #[tokio::test]
    async fn test_memory_store_last_write_wins() {
        let store = MemoryKeyValueStore::new();
        store.put("k", b"one".to_vec()).await.unwrap();
        store.put("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fallback_swallows_broken_primary() {
        let store = FallbackStore::new(Some(Arc::new(BrokenStore)));
        store.put("solar_x", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get("solar_x").await.unwrap(), Some(b"{}".to_vec()));
        store.remove("solar_x").await.unwrap();
        assert!(store.get("solar_x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fjall_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store.put("forecast_1.000_2.000", b"[]".to_vec()).await.unwrap();
        assert_eq!(
            store.get("forecast_1.000_2.000").await.unwrap(),
            Some(b"[]".to_vec())
        );
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fallback_open_uses_disk() {
        let dir = TempDir::new().unwrap();
        let store = FallbackStore::open(dir.path());
        assert!(store.is_persistent());
    }

    #[tokio::test]
    async fn test_json_helpers_treat_corruption_as_miss() {
        let store = MemoryKeyValueStore::new();
        store.put("bad", b"{not json".to_vec()).await.unwrap();
        assert!(get_json::<Vec<u32>>(&store, "bad").await.is_none());

        put_json(&store, "good", &vec![1u32, 2, 3]).await;
        assert_eq!(get_json::<Vec<u32>>(&store, "good").await, Some(vec![1, 2, 3]));

        put_json(&BrokenStore, "ignored", &1u32).await;
        assert!(get_json::<u32>(&BrokenStore, "ignored").await.is_none());
    }
}
