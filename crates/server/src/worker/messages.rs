//! Control message loop.
//!
//! Commands reach the worker task over an mpsc channel. Each one carries its
//! own oneshot sender, so every caller gets exactly its own reply and
//! concurrent callers never see each other's answers.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use patchnotes_core::{Error, WorkerCommand, WorkerReply};

use super::Worker;

const CHANNEL_CAPACITY: usize = 32;

struct Envelope {
    command: WorkerCommand,
    reply: oneshot::Sender<Result<WorkerReply, Error>>,
}

/// Sending side of the worker's message channel.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WorkerHandle {
    /// Post a command and wait for the worker's reply.
    pub async fn send(&self, command: WorkerCommand) -> Result<WorkerReply, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { command, reply })
            .await
            .map_err(|_| Error::WorkerUnavailable("worker task stopped".into()))?;
        rx.await
            .map_err(|_| Error::WorkerUnavailable("worker dropped the reply channel".into()))?
    }
}

/// Start the message loop for `worker`.
pub fn spawn(worker: Worker) -> (WorkerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(run(worker, rx));
    (WorkerHandle { tx }, task)
}

async fn run(worker: Worker, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { command, reply }) = rx.recv().await {
        tracing::debug!(?command, "worker received message");
        let result = worker.handle_message(command).await;
        if let Err(e) = &result {
            tracing::warn!(?command, error = %e, "message failed");
        }
        if reply.send(result).is_err() {
            tracing::debug!(?command, "caller went away before the reply");
        }
    }
    tracing::debug!("worker message loop stopped");
}
