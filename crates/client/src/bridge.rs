//! Page-to-worker messaging bridge.
//!
//! The page never touches cache buckets itself. It asks the worker to clear
//! them over the control route and waits for the single reply, bounded by a
//! timeout. No reachable or activated worker is a normal condition and
//! resolves to `false`.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use url::Url;

use patchnotes_core::message::{MESSAGE_PATH, STATUS_PATH};
use patchnotes_core::{Error, WorkerCommand, WorkerReply, WorkerState, WorkerStatus};

/// Interval between registration polls while a worker is still installing.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Page-side hooks used by the page-wide reset.
pub trait PageHost {
    /// Drop locally persisted UI state such as the saved theme.
    fn clear_local_state(&mut self) -> Result<(), Error>;

    /// Reload the page.
    fn reload(&mut self);
}

/// Client for the worker's control and status routes.
#[derive(Debug, Clone)]
pub struct WorkerBridge {
    http: Client,
    base: Url,
    timeout: Duration,
}

impl WorkerBridge {
    /// Create a bridge to the worker listening at `base`.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, Error> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, base, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current registration, or `None` when no worker answers.
    pub async fn registration(&self) -> Result<Option<WorkerStatus>, Error> {
        let url = self.endpoint(STATUS_PATH)?;
        let response = match self.http.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "no worker registration");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        let status = response
            .json::<WorkerStatus>()
            .await
            .map_err(|e| Error::WorkerUnavailable(format!("malformed status: {}", e)))?;
        Ok(Some(status))
    }

    /// Wait until an activated generation controls the page.
    ///
    /// Returns `None` if there is no worker, the worker became redundant with
    /// nothing left serving, or no generation activated within the timeout.
    pub async fn ready(&self) -> Result<Option<WorkerStatus>, Error> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.registration().await? {
                None => return Ok(None),
                Some(status) if status.is_controlling() => return Ok(Some(status)),
                Some(status) if status.state == WorkerState::Redundant => return Ok(None),
                Some(status) => {
                    if Instant::now() >= deadline {
                        tracing::warn!(state = ?status.state, "worker did not activate in time");
                        return Ok(None);
                    }
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Post one command and wait for its reply.
    ///
    /// `Ok(None)` means the worker refused the command because it is not
    /// active.
    ///
    /// # Errors
    ///
    /// - `Error::MessagingTimeout` if no reply arrives within the timeout
    /// - `Error::WorkerUnavailable` if the worker cannot be reached
    pub async fn post_message(&self, command: WorkerCommand) -> Result<Option<WorkerReply>, Error> {
        let url = self.endpoint(MESSAGE_PATH)?;
        let request = self.http.post(url).json(&command).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::MessagingTimeout(self.timeout.as_millis() as u64))?
            .map_err(|e| Error::WorkerUnavailable(e.to_string()))?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::WorkerUnavailable(format!("control route answered {}", response.status())));
        }

        let reply = tokio::time::timeout(self.timeout, response.json::<WorkerReply>())
            .await
            .map_err(|_| Error::MessagingTimeout(self.timeout.as_millis() as u64))?
            .map_err(|e| Error::WorkerUnavailable(format!("malformed reply: {}", e)))?;

        tracing::debug!(?command, success = reply.success, "worker replied");
        Ok(Some(reply))
    }

    /// Ask the worker to delete only the CSS bucket.
    pub async fn clear_css_cache(&self) -> Result<bool, Error> {
        self.send_when_ready(WorkerCommand::ClearCssCache).await
    }

    /// Delete every cache bucket, then clear local state and reload.
    ///
    /// The local reset and the reload happen whether or not a worker was
    /// present or answered.
    pub async fn clear_all_caches<H: PageHost>(&self, host: &mut H) -> Result<bool, Error> {
        let outcome = self.send_when_ready(WorkerCommand::ClearCache).await;

        let local = host.clear_local_state();
        if let Err(e) = &local {
            tracing::warn!(error = %e, "failed to clear local state");
        }
        host.reload();

        let cleared = outcome?;
        local?;
        Ok(cleared)
    }

    async fn send_when_ready(&self, command: WorkerCommand) -> Result<bool, Error> {
        if self.ready().await?.is_none() {
            tracing::info!(?command, "no active worker, nothing to clear");
            return Ok(false);
        }
        Ok(self.post_message(command).await?.is_some_and(|reply| reply.success))
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base.join(path).map_err(|e| Error::InvalidUrl(e.to_string()))
    }
}
