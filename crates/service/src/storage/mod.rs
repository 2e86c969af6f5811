//! Table and snapshot primitives shared by store instances.
//!
//! A table is a plain `HashMap`; it is only ever touched by the worker that
//! owns it, so no locking lives here.

use std::{collections::HashMap, hash::Hash};

use serde::{de::DeserializeOwned, Serialize};

pub mod snapshot;

/// In-memory mapping owned by one store instance.
pub type Table<K, V> = HashMap<K, V>;

/// Bounds a key must satisfy to be stored and snapshotted.
pub trait StoreKey: Eq + Hash + Serialize + DeserializeOwned + Send + 'static {}

impl<T> StoreKey for T where T: Eq + Hash + Serialize + DeserializeOwned + Send + 'static {}

/// Bounds a value must satisfy to be stored, read back and snapshotted.
///
/// `PartialEq` lets a save confirm the snapshot restores exactly what was written.
pub trait StoreValue: Clone + PartialEq + Serialize + DeserializeOwned + Send + 'static {}

impl<T> StoreValue for T where T: Clone + PartialEq + Serialize + DeserializeOwned + Send + 'static {}
