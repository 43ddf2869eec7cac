//! Process-lifetime replication/verification failure log.
//!
//! Append-only and in-memory: a restart silently discards history, so this
//! is a short-lived diagnostic signal, not an audit trail. Entries are
//! created only by secondary-write and verification failures and removed
//! only by explicit operator action.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use shopfront_core::error::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    /// Name of the failed operation (`create`, `update_stock`, `verify`, ...).
    pub operation: String,
    /// Serialized arguments of the failed call.
    pub arguments: Value,
    pub message: String,
    /// Debug rendering of the error, standing in for a stack trace.
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: RwLock<Vec<ErrorLogEntry>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: &str, arguments: Value, error: &StoreError) {
        let entry = ErrorLogEntry {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            arguments,
            message: error.to_string(),
            detail: format!("{error:?}"),
        };
        self.entries.write().push(entry);
    }

    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.entries.read().clone()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
