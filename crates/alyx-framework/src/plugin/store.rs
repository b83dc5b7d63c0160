//! Persistence of plugin-owned state.
//!
//! The framework treats plugin data as opaque JSON keyed by plugin
//! identifier. [`MemoryStore`] keeps it in process; the runtime provides a
//! file-backed store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

/// Load/save collaborator for per-plugin data.
#[async_trait]
pub trait PluginStore: Send + Sync + 'static {
    /// Returns the stored payload, or `None` if nothing was ever saved.
    async fn load(&self, identifier: &str) -> Result<Option<Value>, StoreError>;

    async fn save(&self, identifier: &str, data: Value) -> Result<(), StoreError>;
}

pub type BoxedStore = Arc<dyn PluginStore>;

// ─── MemoryStore ──────────────────────────────────────────────────────────────

/// In-process store. Data does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStore for MemoryStore {
    async fn load(&self, identifier: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().get(identifier).cloned())
    }

    async fn save(&self, identifier: &str, data: Value) -> Result<(), StoreError> {
        self.entries.write().insert(identifier.to_string(), data);
        Ok(())
    }
}

// ─── PluginData ───────────────────────────────────────────────────────────────

/// Typed state owned by one plugin.
///
/// ```rust,ignore
/// async fn on_load(&self, host: &PluginHost) -> Result<(), BoxError> {
///     self.data.load(host.store().as_ref()).await?;
///     Ok(())
/// }
///
/// async fn on_unload(&self, host: &PluginHost) -> Result<(), BoxError> {
///     self.data.save(host.store().as_ref()).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct PluginData<T> {
    identifier: String,
    state: RwLock<T>,
}

impl<T> PluginData<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            state: RwLock::new(T::default()),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Replaces the in-memory state with the persisted one, or with
    /// `T::default()` when nothing is stored. Returns whether data was found.
    pub async fn load(&self, store: &dyn PluginStore) -> Result<bool, StoreError> {
        let loaded = match store.load(&self.identifier).await? {
            Some(value) => Some(serde_json::from_value::<T>(value)?),
            None => None,
        };
        let found = loaded.is_some();
        *self.state.write() = loaded.unwrap_or_default();
        debug!(plugin = %self.identifier, found, "Plugin data loaded");
        Ok(found)
    }

    /// Persists the current state.
    pub async fn save(&self, store: &dyn PluginStore) -> Result<(), StoreError> {
        let value = serde_json::to_value(&*self.state.read())?;
        store.save(&self.identifier, value).await?;
        debug!(plugin = %self.identifier, "Plugin data saved");
        Ok(())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.state.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.state.write()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[tokio::test]
    async fn test_load_missing_uses_default() {
        let store = MemoryStore::new();
        let data = PluginData::<Counter>::new("1.Counter");
        data.write().hits = 7;

        assert!(!data.load(&store).await.unwrap());
        assert_eq!(*data.read(), Counter::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        let data = PluginData::<Counter>::new("1.Counter");
        data.write().hits = 3;
        data.save(&store).await.unwrap();
        assert_eq!(store.load("1.Counter").await.unwrap(), Some(json!({ "hits": 3 })));

        let reloaded = PluginData::<Counter>::new("1.Counter");
        assert!(reloaded.load(&store).await.unwrap());
        assert_eq!(reloaded.read().hits, 3);
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let store = MemoryStore::new();
        store.save("1.Counter", json!("not an object")).await.unwrap();
        let data = PluginData::<Counter>::new("1.Counter");
        assert!(matches!(data.load(&store).await, Err(StoreError::Serde(_))));
    }
}
