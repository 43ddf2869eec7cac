//! Background replication queue.
//!
//! Secondary writes are never awaited on the request path. They are queued
//! here and drained by one worker task per router; a failed job lands in the
//! [`ErrorLog`] instead of crashing anything or surfacing to the caller.
//! Jobs from one coordinator run in submission order, so a create is applied
//! to the secondary before the update that follows it. There is no retry and
//! no timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use shopfront_core::error::Result;

use crate::error_log::ErrorLog;

type ReplicationFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

struct ReplicationJob {
    operation: &'static str,
    arguments: Value,
    task: ReplicationFuture,
}

enum QueueMessage {
    Job(ReplicationJob),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle feeding the replication worker.
#[derive(Clone)]
pub struct ReplicationHandle {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl ReplicationHandle {
    /// Spawn the worker task. Must be called within a tokio runtime.
    pub fn spawn(error_log: Arc<ErrorLog>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    QueueMessage::Job(job) => {
                        if let Err(err) = job.task.await {
                            tracing::warn!(
                                operation = job.operation,
                                error = %err,
                                "secondary write failed"
                            );
                            error_log.record(job.operation, job.arguments, &err);
                        }
                    }
                    QueueMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Queue one secondary write. Returns immediately; the caller never
    /// learns whether it succeeded.
    pub fn submit<F>(&self, operation: &'static str, arguments: Value, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let job = ReplicationJob {
            operation,
            arguments,
            task: Box::pin(task),
        };
        // A closed queue means the worker is gone (process shutdown); the
        // write is dropped exactly like any other failed secondary write.
        let _ = self.tx.send(QueueMessage::Job(job));
    }

    /// Wait until every job submitted before this call has run.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(QueueMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}
