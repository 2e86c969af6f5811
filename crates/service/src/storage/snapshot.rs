//! Snapshot codec.
//!
//! A snapshot is a JSON envelope `{"version": 1, "entries": [[key, value], ...]}`.
//! Entries are stored as pairs rather than a JSON object so that integer,
//! tuple and other non-string keys keep their shape. Floats are written in
//! shortest round-trip form and parsed with `float_roundtrip`, so every finite
//! `f64` comes back bit for bit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{StoreKey, StoreValue, Table};
use crate::errors::StoreError;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a, K, V> {
    version: u32,
    entries: Vec<(&'a K, &'a V)>,
}

#[derive(Deserialize)]
struct SnapshotOwned<K, V> {
    version: u32,
    entries: Vec<(K, V)>,
}

/// Serialize the complete table into snapshot bytes.
///
/// Fails with `Encode` when the bytes would not restore an equal table, e.g. a
/// NaN or infinite float, which JSON can only write as `null`.
pub fn encode<K: StoreKey, V: StoreValue>(table: &Table<K, V>) -> Result<Vec<u8>, StoreError> {
    let snapshot = SnapshotRef { version: SNAPSHOT_VERSION, entries: table.iter().collect() };
    let bytes = serde_json::to_vec(&snapshot).map_err(|e| StoreError::Encode(e.to_string()))?;
    let restored: Table<K, V> = decode(&bytes, Path::new("<encoded>"))
        .map_err(|e| StoreError::Encode(format!("snapshot would not restore: {e}")))?;
    if restored != *table {
        return Err(StoreError::Encode(
            "table holds values the snapshot cannot represent exactly (NaN or infinite floats?)".into(),
        ));
    }
    Ok(bytes)
}

/// Decode snapshot bytes into a fresh table. `path` is only used for error reporting.
pub fn decode<K: StoreKey, V: StoreValue>(bytes: &[u8], path: &Path) -> Result<Table<K, V>, StoreError> {
    let snapshot: SnapshotOwned<K, V> =
        serde_json::from_slice(bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::corrupt(path, format!("unsupported snapshot version {}", snapshot.version)));
    }
    // later duplicates win, matching repeated `set` calls
    Ok(snapshot.entries.into_iter().collect())
}

/// Overwrite `path` with already encoded snapshot bytes.
pub async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<usize, StoreError> {
    let len = bytes.len();
    fs::write(path, bytes).await.map_err(|e| StoreError::io(path, e))?;
    Ok(len)
}

/// Read `path` and decode it into a new table; nothing is returned on partial success.
pub async fn read_file<K: StoreKey, V: StoreValue>(path: &Path) -> Result<Table<K, V>, StoreError> {
    let bytes = fs::read(path).await.map_err(|e| StoreError::io(path, e))?;
    decode(&bytes, path)
}
