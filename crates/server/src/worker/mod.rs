//! The cache-control worker.
//!
//! A worker is built for one generation. It installs the app shell into the
//! static bucket, activates by pruning every other generation, and then
//! intercepts same-origin GET requests:
//!
//! - stylesheets go through the CSS policy (bust markers hit the network,
//!   cached sheets are served stale-while-revalidate, failures become an
//!   empty stylesheet)
//! - everything else is cache-first over the static and dynamic buckets,
//!   with successful responses on dynamic paths stored in the background
//! - HTML requests fall back to the cached shell document when offline
//!
//! Until activation, the generation named by the persisted pointer keeps
//! serving. Without one, requests pass straight to the network. Requests
//! for another origin are refused.

pub mod css;
pub mod inflight;
pub mod messages;
pub mod notify;

use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::RwLock;
use url::Url;

use patchnotes_core::http::{Network, Request, Response};
use patchnotes_core::{
    AppConfig, BucketName, BucketSet, CacheDb, CachedEntry, Error, Generation, WorkerCommand, WorkerReply, WorkerState,
    WorkerStatus,
};

use self::inflight::InFlight;

/// What a worker build caches and where.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub generation: Generation,
    /// App-shell paths fetched at install time.
    pub static_assets: Vec<String>,
    /// Path fragments whose responses are stored in the dynamic bucket.
    pub dynamic_patterns: Vec<String>,
    pub shell_document: String,
}

impl From<&AppConfig> for WorkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            generation: config.generation(),
            static_assets: config.static_assets.clone(),
            dynamic_patterns: config.dynamic_patterns.clone(),
            shell_document: config.shell_document.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    state: WorkerState,
    /// Generation whose buckets answer lookups.
    serving: Option<Generation>,
    /// Bumped by every clear command.
    clears: u64,
}

impl Lifecycle {
    fn ticket(&self) -> Option<StoreTicket> {
        self.serving.map(|generation| StoreTicket { generation, clears: self.clears })
    }

    /// Whether a write taken under `ticket` may still land.
    fn admits(&self, ticket: StoreTicket) -> bool {
        self.serving == Some(ticket.generation) && self.clears == ticket.clears
    }
}

/// Snapshot of the lifecycle taken when a request starts.
///
/// Writes deferred past the request carry it, so they are dropped instead
/// of recreating a bucket that activation or a clear deleted meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoreTicket {
    generation: Generation,
    clears: u64,
}

impl StoreTicket {
    fn buckets(&self) -> BucketSet {
        BucketSet::new(self.generation)
    }
}

/// Handle to a worker. Clones share state.
#[derive(Clone)]
pub struct Worker {
    db: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    config: Arc<WorkerConfig>,
    lifecycle: Arc<RwLock<Lifecycle>>,
    inflight: InFlight,
}

impl Worker {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, origin: Url, config: WorkerConfig) -> Self {
        Self {
            db,
            network,
            origin,
            config: Arc::new(config),
            lifecycle: Arc::new(RwLock::new(Lifecycle { state: WorkerState::Installing, serving: None, clears: 0 })),
            inflight: InFlight::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.config.generation
    }

    pub fn buckets(&self) -> BucketSet {
        BucketSet::new(self.config.generation)
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    pub async fn status(&self) -> WorkerStatus {
        let lifecycle = *self.lifecycle.read().await;
        WorkerStatus::new(lifecycle.state, self.config.generation, lifecycle.serving)
    }

    /// Pick up the generation a previous run activated.
    pub async fn restore(&self) -> Result<Option<Generation>, Error> {
        let previous = self.db.current_generation().await?;
        self.lifecycle.write().await.serving = previous;
        if let Some(generation) = previous {
            tracing::info!(%generation, "previous generation is serving");
        }
        Ok(previous)
    }

    /// Install, then activate.
    ///
    /// A failed install leaves this worker redundant and the previous
    /// generation serving.
    pub async fn register(&self) -> Result<(), Error> {
        self.install().await?;
        self.activate().await?;
        Ok(())
    }

    /// Fetch every app-shell asset and store them as the static bucket.
    ///
    /// Nothing is written unless every asset was fetched.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheInstall` naming the first asset that failed.
    pub async fn install(&self) -> Result<usize, Error> {
        self.set_state(WorkerState::Installing).await;
        tracing::info!(generation = %self.config.generation, "installing");

        match self.install_assets().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(count, "static assets cached");
                Ok(count)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::error!(error = %e, "install failed, worker is redundant");
                Err(e)
            }
        }
    }

    async fn install_assets(&self) -> Result<usize, Error> {
        let urls = self
            .config
            .static_assets
            .iter()
            .map(|path| {
                self.origin.join(path).map_err(|e| Error::CacheInstall { url: path.clone(), reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = try_join_all(urls.into_iter().map(|url| self.fetch_asset(url))).await?;
        self.db.install_bucket(self.buckets().static_bucket(), entries).await
    }

    async fn fetch_asset(&self, url: Url) -> Result<CachedEntry, Error> {
        let install_error = |reason: String| Error::CacheInstall { url: url.to_string(), reason };

        let response = self
            .network
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| install_error(e.to_string()))?;
        if !response.is_success() {
            return Err(install_error(format!("status {}", response.status)));
        }
        Ok(CachedEntry::get(url.as_str(), response))
    }

    /// Delete every bucket of another generation and move the pointer here.
    ///
    /// Returns the deleted buckets.
    pub async fn activate(&self) -> Result<Vec<BucketName>, Error> {
        let state = self.state().await;
        if state != WorkerState::Installed {
            return Err(Error::Lifecycle(format!("cannot activate a worker in state {state:?}")));
        }
        self.set_state(WorkerState::Activating).await;

        // Held across the prune so no deferred write for the old generation
        // lands in between.
        let mut lifecycle = self.lifecycle.write().await;
        let generation = self.config.generation;
        let removed = self.db.delete_buckets_except(generation).await?;
        for bucket in &removed {
            tracing::info!(%bucket, "clearing old cache");
        }
        self.db.set_current_generation(generation).await?;

        lifecycle.state = WorkerState::Activated;
        lifecycle.serving = Some(generation);
        tracing::info!(%generation, "activated");

        Ok(removed)
    }

    async fn set_state(&self, state: WorkerState) {
        self.lifecycle.write().await.state = state;
    }

    /// Answer an intercepted request.
    ///
    /// Non-GET requests, and every request while no generation is serving,
    /// go to the network untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a URL on another origin; the
    /// network is never contacted for it.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, Error> {
        if request.url.origin() != self.origin.origin() {
            tracing::warn!(url = %request.url, "refusing cross-origin request");
            return Err(Error::InvalidInput(format!("cross-origin request refused: {}", request.url)));
        }
        if !request.is_get() {
            return self.network.fetch(&request).await;
        }

        let ticket = self.lifecycle.read().await.ticket();
        let Some(ticket) = ticket else {
            return self.network.fetch(&request).await;
        };

        if css::is_stylesheet(&request.url) {
            return Ok(self.handle_css(request, ticket).await);
        }
        self.cache_first(request, ticket).await
    }

    async fn cache_first(&self, request: Request, ticket: StoreTicket) -> Result<Response, Error> {
        let buckets = ticket.buckets();
        let key = request_key(&request.url);
        let lookup = [buckets.static_bucket(), buckets.dynamic_bucket()];

        if let Some(hit) = self.lookup(&lookup, &key).await {
            tracing::debug!(url = %key, "serving from cache");
            return Ok(hit);
        }

        let guard = if self.is_dynamic(&request.url) {
            let guard = self.inflight.acquire(&key).await;
            // Another request may have stored it while we waited.
            if let Some(hit) = self.lookup(&lookup, &key).await {
                tracing::debug!(url = %key, "serving from cache after in-flight fetch");
                return Ok(hit);
            }
            Some(guard)
        } else {
            None
        };

        match self.network.fetch(&request).await {
            Ok(response) => {
                if let Some(guard) = guard
                    && self.is_storable(&response)
                {
                    let worker = self.clone();
                    let entry = CachedEntry::get(&key, response.clone());
                    tokio::spawn(async move {
                        let _guard = guard;
                        worker.store(ticket, buckets.dynamic_bucket(), entry).await;
                    });
                }
                Ok(response)
            }
            Err(e) => {
                if request.accepts_html()
                    && let Some(shell) = self.shell(&lookup).await
                {
                    tracing::info!(url = %key, "network failed, serving offline shell");
                    return Ok(shell);
                }
                Err(e)
            }
        }
    }

    async fn handle_css(&self, request: Request, ticket: StoreTicket) -> Response {
        let url = request.url.clone();
        match self.css_response(request, ticket).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "stylesheet request failed, serving empty stylesheet");
                Response::empty_stylesheet(url)
            }
        }
    }

    async fn css_response(&self, request: Request, ticket: StoreTicket) -> Result<Response, Error> {
        let key = css::cache_key(&request.url).to_string();
        let bucket = ticket.buckets().css_bucket();

        if css::has_bust_marker(&request.url) {
            let response = self.network.fetch(&request).await?;
            if response.is_success() {
                self.store(ticket, bucket, CachedEntry::get(&key, response.clone())).await;
            }
            return Ok(response);
        }

        if let Some(hit) = self.db.match_entry(bucket, "GET", &key).await? {
            tracing::debug!(url = %key, "serving stylesheet from cache");
            self.spawn_css_refresh(request, ticket, key);
            return Ok(hit);
        }

        let response = self.network.fetch(&request).await?;
        if response.is_success() {
            self.store(ticket, bucket, CachedEntry::get(&key, response.clone())).await;
        }
        Ok(response)
    }

    fn spawn_css_refresh(&self, request: Request, ticket: StoreTicket, key: String) {
        let worker = self.clone();
        tokio::spawn(async move {
            match worker.network.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    let bucket = ticket.buckets().css_bucket();
                    worker.store(ticket, bucket, CachedEntry::get(&key, response)).await;
                }
                Ok(response) => tracing::debug!(url = %key, status = response.status, "stylesheet refresh skipped"),
                Err(e) => tracing::debug!(url = %key, error = %e, "stylesheet refresh failed"),
            }
        });
    }

    /// Write an entry unless the lifecycle moved on since `ticket` was taken.
    ///
    /// The read guard is held across the write; activation and clears take
    /// the write side.
    async fn store(&self, ticket: StoreTicket, bucket: BucketName, entry: CachedEntry) {
        let lifecycle = self.lifecycle.read().await;
        if !lifecycle.admits(ticket) {
            tracing::debug!(url = %entry.url, %bucket, "bucket retired, dropping cache write");
            return;
        }
        match self.db.put_entry(bucket, entry).await {
            Ok(()) => tracing::debug!(%bucket, "cached response"),
            Err(e) => tracing::warn!(%bucket, error = %e, "cache put failed"),
        }
    }

    async fn lookup(&self, buckets: &[BucketName], key: &str) -> Option<Response> {
        match self.db.match_any(buckets, "GET", key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn shell(&self, buckets: &[BucketName]) -> Option<Response> {
        let url = self.origin.join(&self.config.shell_document).ok()?;
        self.lookup(buckets, url.as_str()).await
    }

    fn is_dynamic(&self, url: &Url) -> bool {
        let path = url.path();
        self.config.dynamic_patterns.iter().any(|pattern| path.contains(pattern.as_str()))
    }

    /// Only plain 200 responses from our own origin are stored.
    fn is_storable(&self, response: &Response) -> bool {
        response.status == 200 && response.url.origin() == self.origin.origin()
    }

    /// Handle one control command.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerUnavailable` while no generation is serving.
    pub async fn handle_message(&self, command: WorkerCommand) -> Result<WorkerReply, Error> {
        let mut lifecycle = self.lifecycle.write().await;
        let Some(generation) = lifecycle.serving else {
            return Err(Error::WorkerUnavailable("no active worker".into()));
        };
        lifecycle.clears += 1;

        match command {
            WorkerCommand::ClearCache => {
                let deleted = self.db.delete_all_buckets().await?;
                tracing::info!(deleted, "cleared all caches");
            }
            WorkerCommand::ClearCssCache => {
                let bucket = BucketSet::new(generation).css_bucket();
                let existed = self.db.delete_bucket(bucket).await?;
                tracing::info!(%bucket, existed, "cleared CSS cache");
            }
        }

        Ok(WorkerReply { success: true })
    }
}

/// Cache key of a request URL. Fragments never reach the network.
fn request_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
