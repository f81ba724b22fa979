//! SQLite-backed local storage.
//!
//! One database holds both halves of the offline state:
//!
//! - Response partitions (precache, fallback images, fallback responses)
//!   keyed by a SHA-256 digest of the request
//! - The catalog record store used to resolve category fallbacks
//!
//! Schema versions are tracked by the migration table, and WAL mode lets
//! readers proceed while the import transaction runs.

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partitions;
pub mod records;

pub use crate::Error;

pub use connection::StorageDb;
pub use names::{CacheName, CacheNames};
pub use partitions::{CacheStore, Partition};
pub use records::{CatalogRecord, RecordStore};
