//! Patch manifest loading.
//!
//! The manifest is requested with caching disabled at the request level and
//! parsed with the strict record schema. Validation errors are fatal,
//! validation warnings are only logged. There are no automatic retries.

use std::sync::Arc;

use patchnotes_core::http::{Network, Request};
use patchnotes_core::patch::{Manifest, PatchRecord, validate_current};
use patchnotes_core::Error;
use url::Url;

/// Loads the patch manifest through a [`Network`].
#[derive(Clone)]
pub struct PatchLoader {
    network: Arc<dyn Network>,
    manifest_url: Url,
}

impl PatchLoader {
    pub fn new(network: Arc<dyn Network>, manifest_url: Url) -> Self {
        Self { network, manifest_url }
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    /// Fetch and parse the manifest.
    ///
    /// # Errors
    ///
    /// - `Error::Fetch` on transport failure or a non-2xx status
    /// - `Error::DataFormat` if the body is malformed, the `balance` array
    ///   is missing or empty, or validation reports errors
    pub async fn load(&self) -> Result<Vec<PatchRecord>, Error> {
        let request = Request::get(self.manifest_url.clone())
            .with_header("Accept", "application/json")
            .with_header("Cache-Control", "no-cache")
            .with_header("Pragma", "no-cache");

        let response = self.network.fetch(&request).await.map_err(|e| match e {
            Error::Fetch(msg) => Error::Fetch(msg),
            other => Error::Fetch(other.to_string()),
        })?;

        tracing::debug!(status = response.status, url = %self.manifest_url, "manifest response");

        if !response.is_success() {
            return Err(Error::Fetch(format!("Network response was not ok: status {}", response.status)));
        }

        let manifest = Manifest::parse(&response.body)?;

        let report = validate_current(&manifest.balance);
        for warning in &report.warnings {
            tracing::warn!(%warning, "manifest warning");
        }
        if let Some(first) = report.errors.first() {
            return Err(Error::DataFormat(format!("{} ({} errors)", first, report.errors.len())));
        }

        tracing::info!(count = manifest.balance.len(), "successfully loaded patches");
        Ok(manifest.balance)
    }
}
