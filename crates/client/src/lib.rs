//! Client code for patchnotes.
//!
//! This crate provides the HTTP fetch pipeline, the manifest loader, the
//! page driver and the page-to-worker messaging bridge shared by the worker
//! and the CLI.

pub mod bridge;
pub mod fetch;
pub mod loader;
pub mod local_state;
pub mod page;

pub use bridge::{PageHost, WorkerBridge};
pub use fetch::{FetchClient, FetchConfig};
pub use loader::PatchLoader;
pub use local_state::LocalStore;
pub use page::Page;
