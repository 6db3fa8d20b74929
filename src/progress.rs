use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::SinkError;

/// Receiver of human-readable scan status lines.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), SinkError>;
}

/// Prints status lines to stderr, leaving stdout to the report.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[async_trait]
impl ProgressSink for ConsoleSink {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        eprintln!("[*] {}", message);
        Ok(())
    }
}

/// Emits status lines as `info` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        info!(target: "subprobe::progress", "{}", message);
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for UnboundedSender<String> {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        self.send(message.to_string())?;
        Ok(())
    }
}

#[derive(Debug)]
enum Delivery {
    Message(String),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget front end for a [`ProgressSink`].
///
/// Messages are queued and delivered by a background task, so a slow or
/// failing sink never holds up the scan. Delivery errors are logged and
/// dropped.
#[derive(Debug, Clone)]
pub struct Progress {
    tx: Option<UnboundedSender<Delivery>>,
}

impl Progress {
    pub fn spawn(sink: Arc<dyn ProgressSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();

        tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Delivery::Message(message) => {
                        if let Err(e) = sink.notify(&message).await {
                            warn!(error = %e, "progress notification failed");
                        }
                    }
                    Delivery::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx: Some(tx) }
    }

    /// A progress handle that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Delivery::Message(message.into()));
        }
    }

    /// Waits until every message emitted so far has reached the sink.
    pub async fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (done, delivered) = oneshot::channel();
            if tx.send(Delivery::Flush(done)).is_ok() {
                let _ = delivered.await;
            }
        }
    }
}
