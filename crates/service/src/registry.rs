//! Explicit name -> instance registry.
//!
//! Owned by the composition root and passed to whoever needs to address
//! stores by name. Creating the registry starts the default instance.

use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::errors::StoreError;
use crate::storage::{StoreKey, StoreValue};
use crate::store::StoreHandle;

/// Name of the instance every registry starts with unless told otherwise.
pub const DEFAULT_STORE_NAME: &str = "default";

pub struct StoreRegistry<K, V> {
    stores: Arc<DashMap<String, StoreHandle<K, V>>>,
    default_name: Arc<str>,
}

impl<K, V> Clone for StoreRegistry<K, V> {
    fn clone(&self) -> Self {
        Self { stores: Arc::clone(&self.stores), default_name: Arc::clone(&self.default_name) }
    }
}

impl<K: StoreKey, V: StoreValue> StoreRegistry<K, V> {
    /// Registry with its default instance under [`DEFAULT_STORE_NAME`].
    ///
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_default_name(DEFAULT_STORE_NAME)
    }

    /// Registry with its default instance registered under `default_name`.
    pub fn with_default_name(default_name: &str) -> Self {
        let registry = Self { stores: Arc::new(DashMap::new()), default_name: Arc::from(default_name) };
        registry.stores.insert(default_name.to_string(), StoreHandle::spawn(default_name));
        registry
    }

    /// Start a new empty instance under `name`.
    ///
    /// A name whose previous instance has terminated may be reused.
    pub fn create(&self, name: &str) -> Result<StoreHandle<K, V>, StoreError> {
        match self.stores.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_running() {
                    return Err(StoreError::DuplicateName(name.to_string()));
                }
                let handle = StoreHandle::spawn(name);
                entry.insert(handle.clone());
                info!(service = "kvstore", event = "store_created", store = name, replaced_terminated = true, "store registered");
                Ok(handle)
            }
            Entry::Vacant(entry) => {
                let handle = StoreHandle::spawn(name);
                entry.insert(handle.clone());
                info!(service = "kvstore", event = "store_created", store = name, "store registered");
                Ok(handle)
            }
        }
    }
}

impl<K, V> StoreRegistry<K, V> {
    pub fn default_name(&self) -> &str { &self.default_name }

    /// Handle for a registered, still running instance.
    pub fn lookup(&self, name: &str) -> Result<StoreHandle<K, V>, StoreError> {
        // Clone out of the map before touching it again; holding a `Ref` while
        // removing would deadlock the shard.
        let handle = self.stores.get(name).map(|h| h.value().clone());
        match handle {
            Some(handle) if handle.is_running() => Ok(handle),
            Some(_) => {
                self.stores.remove_if(name, |_, h| !h.is_running());
                Err(StoreError::not_found(name))
            }
            None => Err(StoreError::not_found(name)),
        }
    }

    /// Handle for the implicit instance created at startup.
    pub fn default_store(&self) -> Result<StoreHandle<K, V>, StoreError> {
        self.lookup(&self.default_name)
    }

    /// Names of all registered instances, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Stop `name` after it drains what is already queued, and unregister it.
    pub async fn terminate(&self, name: &str) -> Result<(), StoreError> {
        let (_, handle) = self.stores.remove(name).ok_or_else(|| StoreError::not_found(name))?;
        handle.stop();
        handle.closed().await;
        info!(service = "kvstore", event = "store_terminated", store = name, "store unregistered");
        Ok(())
    }

    /// Terminate every registered instance.
    pub async fn shutdown(&self) {
        let names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        for name in names {
            // a concurrent terminate may have won the race; that is fine
            let _ = self.terminate(&name).await;
        }
    }
}

impl<K: StoreKey, V: StoreValue> StoreRegistry<K, V> {
    /// Fire-and-forget write addressed by name. Only name resolution can fail.
    pub fn set(&self, name: &str, key: K, value: V) -> Result<(), StoreError> {
        self.lookup(name)?.set(key, value);
        Ok(())
    }

    pub async fn get(&self, name: &str, key: K) -> Result<Option<V>, StoreError> {
        self.lookup(name)?.get(key).await
    }

    pub async fn save(&self, name: &str, path: impl AsRef<Path>) -> Result<(), StoreError> {
        self.lookup(name)?.save(path).await
    }

    pub async fn load(&self, name: &str, path: impl AsRef<Path>) -> Result<(), StoreError> {
        self.lookup(name)?.load(path).await
    }
}

impl<K: StoreKey, V: StoreValue> Default for StoreRegistry<K, V> {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_instance_exists() -> Result<(), anyhow::Error> {
        let registry = StoreRegistry::<i64, i64>::new();
        assert_eq!(registry.names(), vec![DEFAULT_STORE_NAME.to_string()]);
        let store = registry.default_store()?;
        assert_eq!(store.name(), DEFAULT_STORE_NAME);
        assert_eq!(store.get(123).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_create_fails_and_keeps_data() -> Result<(), anyhow::Error> {
        let registry = StoreRegistry::<String, String>::new();
        let x = registry.create("x")?;
        x.set("k".into(), "v".into());

        let err = registry.create("x").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(ref n) if n == "x"), "got {err:?}");
        assert!(matches!(registry.create(DEFAULT_STORE_NAME), Err(StoreError::DuplicateName(_))));

        assert_eq!(registry.get("x", "k".into()).await?, Some("v".into()));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let registry = StoreRegistry::<i64, i64>::new();
        assert!(matches!(registry.lookup("nope"), Err(StoreError::InstanceNotFound(_))));
        assert!(matches!(registry.set("nope", 1, 1), Err(StoreError::InstanceNotFound(_))));
        assert!(matches!(registry.get("nope", 1).await, Err(StoreError::InstanceNotFound(_))));
        assert!(matches!(registry.terminate("nope").await, Err(StoreError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn terminate_drains_then_frees_the_name() -> Result<(), anyhow::Error> {
        let registry = StoreRegistry::<i64, i64>::new();
        let old = registry.create("tmp")?;
        old.set(1, 10);
        let pending = old.clone();
        let read = tokio::spawn(async move { pending.get(1).await });
        tokio::task::yield_now().await;

        registry.terminate("tmp").await?;
        assert!(!old.is_running());
        assert!(matches!(old.get(1).await, Err(StoreError::InstanceNotFound(_))));
        assert!(matches!(registry.lookup("tmp"), Err(StoreError::InstanceNotFound(_))));
        // a get enqueued before termination either completed or saw the shutdown
        match read.await? {
            Ok(v) => assert_eq!(v, Some(10)),
            Err(e) => assert!(matches!(e, StoreError::InstanceNotFound(_))),
        }

        let fresh = registry.create("tmp")?;
        assert_eq!(fresh.get(1).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn terminate_clears_metrics_before_returning() -> Result<(), anyhow::Error> {
        let name = format!("metrics-{}", uuid::Uuid::new_v4());
        let registry = StoreRegistry::<i64, i64>::new();
        let store = registry.create(&name)?;
        store.set(1, 1);
        assert_eq!(store.get(1).await?, Some(1));
        let missing = std::env::temp_dir().join(format!("kvstore_registry_missing_{}.json", uuid::Uuid::new_v4()));
        assert!(store.load(&missing).await.is_err());

        let label = format!("store=\"{name}\"");
        let (_, body) = crate::observability::encode_metrics();
        assert!(body.contains(&label), "series should exist while running");

        registry.terminate(&name).await?;
        let (_, body) = crate::observability::encode_metrics();
        assert!(!body.contains(&label), "series left behind after terminate:\n{body}");
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_stops_everything()-> Result<(), anyhow::Error> {
        let registry = StoreRegistry::<i64, i64>::with_default_name("main");
        let a = registry.create("a")?;
        let main = registry.default_store()?;
        registry.shutdown().await;

        assert!(registry.names().is_empty());
        assert!(!a.is_running());
        assert!(!main.is_running());
        assert!(matches!(registry.default_store(), Err(StoreError::InstanceNotFound(_))));
        Ok(())
    }
}
