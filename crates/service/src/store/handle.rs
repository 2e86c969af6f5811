use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::worker::StoreWorker;
use super::Command;
use crate::errors::StoreError;
use crate::storage::{StoreKey, StoreValue};

/// Cloneable address of one running store instance.
///
/// All clones feed the same queue, so operations issued through any of them
/// are applied in the order they reach the instance.
pub struct StoreHandle<K, V> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Command<K, V>>,
}

impl<K, V> Clone for StoreHandle<K, V> {
    fn clone(&self) -> Self {
        Self { name: Arc::clone(&self.name), tx: self.tx.clone() }
    }
}

impl<K, V> std::fmt::Debug for StoreHandle<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

impl<K: StoreKey, V: StoreValue> StoreHandle<K, V> {
    /// Start a new, empty instance on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(name: &str) -> Self {
        let name: Arc<str> = Arc::from(name);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(StoreWorker::new(Arc::clone(&name), rx).run());
        Self { name, tx }
    }

    /// Enqueue `key -> value` without waiting for it to be applied.
    ///
    /// Writes to a terminated instance are dropped; nothing is reported back.
    pub fn set(&self, key: K, value: V) {
        if self.tx.send(Command::Set { key, value }).is_err() {
            warn!(store = %self.name, "write dropped: store instance terminated");
        }
    }

    /// Current value for `key`, or `None` if absent. Sees every earlier `set`.
    pub async fn get(&self, key: K) -> Result<Option<V>, StoreError> {
        self.request(|reply| Command::Get { key, reply }).await
    }

    /// Number of entries in the table at this point in the queue.
    pub async fn len(&self) -> Result<usize, StoreError> {
        self.request(|reply| Command::Len { reply }).await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Write the whole table to `path`, overwriting any existing file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref().to_path_buf();
        self.request(|reply| Command::Save { path, reply }).await?
    }

    /// Replace the whole table with the snapshot at `path`.
    ///
    /// On any failure the current table is kept untouched.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.request(|reply| Command::Load { path, reply }).await?
    }
}

impl<K, V> StoreHandle<K, V> {
    pub fn name(&self) -> &str { &self.name }

    /// `false` once the instance has terminated.
    pub fn is_running(&self) -> bool { !self.tx.is_closed() }

    /// Ask the instance to stop once everything already queued has been applied.
    pub(crate) fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Resolves when the instance has terminated.
    pub(crate) async fn closed(&self) {
        self.tx.closed().await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command<K, V>) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| StoreError::not_found(&self.name))?;
        rx.await.map_err(|_| StoreError::not_found(&self.name))
    }
}
