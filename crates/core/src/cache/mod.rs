//! SQLite-backed cache storage for the worker.
//!
//! This module provides named, generation-tagged cache buckets holding
//! HTTP responses keyed by request. It supports:
//!
//! - Request keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - A persisted current-generation pointer

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use buckets::{BucketClass, BucketName, BucketSet, Generation};
pub use connection::CacheDb;
pub use entries::CachedEntry;
