//! The patchnotes cache-control worker.
//!
//! A reverse proxy in front of the static site that installs the app shell
//! into generation-tagged buckets, serves requests cache-first and answers
//! cache-clearing commands from the page.

pub mod error;
pub mod routes;
pub mod worker;

pub use error::ApiError;
pub use routes::{AppState, router};
pub use worker::messages::WorkerHandle;
pub use worker::{Worker, WorkerConfig};
