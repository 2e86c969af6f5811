//! Process-local key-value store built from independent actor instances.
//! - Each instance owns one table and applies operations strictly in arrival order.
//! - Snapshots replace a table wholesale or not at all.
//! - Instances are addressed through an explicit [`registry::StoreRegistry`].

pub mod errors;
pub mod observability;
pub mod registry;
pub mod runtime;
pub mod storage;
pub mod store;

pub use errors::StoreError;
pub use registry::{StoreRegistry, DEFAULT_STORE_NAME};
pub use store::StoreHandle;
