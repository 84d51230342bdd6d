//! Asynchronous Error Log Sink
//!
//! Every error reply the API produces is also appended to a persistent
//! log file. Store operations must never stall on logging, so the sink is
//! a bounded channel with a single consumer task doing the file I/O:
//! producers hand the message off with `try_send` and move on. When the
//! queue is full the message is dropped and a `tracing` warning notes it.

use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// How many pending messages the sink buffers before dropping new ones.
pub const ERROR_QUEUE_CAPACITY: usize = 1024;

/// Default log file, appended to in the working directory.
pub const DEFAULT_ERROR_LOG: &str = "error.log";

/// Producer handle for the error log. Cheap to clone; all clones feed the
/// same consumer task.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<String>,
}

impl ErrorSink {
    /// Spawns the consumer task appending to `path` and returns the
    /// producer handle. Must be called from within a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::channel(ERROR_QUEUE_CAPACITY);
        tokio::spawn(drain(path.into(), rx));
        Self { tx }
    }

    /// Enqueues an error message without ever blocking the caller.
    pub fn report(&self, message: &str) {
        if let Err(e) = self.tx.try_send(message.to_string()) {
            warn!(error = %e, "error log queue full, dropping message");
        }
    }
}

/// The consumer task: one line per message, appended in arrival order.
async fn drain(path: PathBuf, mut rx: mpsc::Receiver<String>) {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await;
    let mut file = match file {
        Ok(f) => f,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to open error log");
            // Keep receiving so producers still see a live queue
            while rx.recv().await.is_some() {}
            return;
        }
    };

    while let Some(message) = rx.recv().await {
        let line = format!("{message}\n");
        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!(path = %path.display(), error = %e, "failed to append to error log");
        }
    }
}
