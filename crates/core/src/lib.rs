//! Core types and shared functionality for pantry-offline.
//!
//! This crate provides:
//! - SQLite-backed cache partitions and catalog record store
//! - Request/response types shared by the engine and the proxy
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use http::{HttpResponse, InterceptedRequest};
pub use store::{CacheName, CacheStore, CatalogRecord, Partition, RecordStore, StorageDb};
