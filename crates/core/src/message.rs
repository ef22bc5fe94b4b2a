//! Control messages exchanged between the page and the worker.
//!
//! Commands travel as `{"type": "CLEAR_CACHE"}` objects and are answered by
//! exactly one [`WorkerReply`].

use serde::{Deserialize, Serialize};

use crate::cache::Generation;

/// Path of the control route on the worker.
pub const MESSAGE_PATH: &str = "/__worker/message";
/// Path of the registration/status route on the worker.
pub const STATUS_PATH: &str = "/__worker/status";
pub const PUSH_PATH: &str = "/__worker/push";
pub const NOTIFICATION_CLICK_PATH: &str = "/__worker/notificationclick";

/// A page-to-worker command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerCommand {
    /// Delete every cache bucket.
    ClearCache,
    /// Delete only the CSS bucket of the active generation.
    #[serde(rename = "CLEAR_CSS_CACHE")]
    ClearCssCache,
}

/// The single reply to a [`WorkerCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub success: bool,
}

/// Lifecycle state of a worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an activated worker intercepts requests and answers commands.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Activated)
    }
}

/// Registration info reported by the status route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    /// Generation this worker was built for.
    pub generation: u32,
    /// Generation currently serving from cache, if any.
    pub serving: Option<u32>,
}

impl WorkerStatus {
    pub fn new(state: WorkerState, generation: Generation, serving: Option<Generation>) -> Self {
        Self { state, generation: generation.0, serving: serving.map(|g| g.0) }
    }

    /// Whether some generation controls the page, either this one or the
    /// previous one that keeps serving while this one installs.
    pub fn is_controlling(&self) -> bool {
        self.state.is_active() || self.serving.is_some()
    }
}
