//! Store instances.
//!
//! Each instance is a single tokio task draining an unbounded FIFO queue of
//! [`Command`]s. The task exclusively owns its table, so operations on one
//! instance never overlap and are applied in the order they were enqueued.
//! Callers talk to the task through a cloneable [`StoreHandle`].

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::errors::StoreError;

mod handle;
mod worker;

pub use handle::StoreHandle;

pub(crate) enum Command<K, V> {
    Set { key: K, value: V },
    Get { key: K, reply: oneshot::Sender<Option<V>> },
    Len { reply: oneshot::Sender<usize> },
    Save { path: PathBuf, reply: oneshot::Sender<Result<(), StoreError>> },
    Load { path: PathBuf, reply: oneshot::Sender<Result<(), StoreError>> },
    /// Stop after everything queued ahead of this has been applied.
    Stop,
}

/// Every value `Command::op` can return; used as metric labels.
pub(crate) const OPS: [&str; 6] = ["set", "get", "len", "save", "load", "stop"];

impl<K, V> Command<K, V> {
    fn op(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Len { .. } => "len",
            Command::Save { .. } => "save",
            Command::Load { .. } => "load",
            Command::Stop => "stop",
        }
    }
}
