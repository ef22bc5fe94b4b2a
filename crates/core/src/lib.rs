//! Core types and shared functionality for patchnotes.
//!
//! This crate provides:
//! - Cache storage with a SQLite backend
//! - The patch manifest model, validation, search and rendering
//! - Unified error types
//! - Configuration structures
//! - The page/worker control protocol

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod page;
pub mod patch;
pub mod render;
pub mod search;

pub use cache::{BucketClass, BucketName, BucketSet, CacheDb, CachedEntry, Generation};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Network, Request, Response};
pub use message::{WorkerCommand, WorkerReply, WorkerState, WorkerStatus};
pub use patch::{Manifest, PatchRecord};
