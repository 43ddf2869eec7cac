//! Online store-migration layer.
//!
//! Lets every domain service serve live traffic while the backing store is
//! switched, piece by piece, from the document database to the single-table
//! wide-column store — no downtime, no big-bang cutover:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       MIGRATION ROUTER                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  domain service ──► products()/orders()/... ──┐                      │
//! │                                               ▼                      │
//! │        phase: DOCUMENT_ONLY ──────────► document adapter             │
//! │        phase: DUAL_WRITE_DOC_PRIMARY ─► dual-write(doc, widecol)     │
//! │        phase: DUAL_WRITE_WC_PRIMARY ──► dual-write(widecol, doc)     │
//! │        phase: WIDECOL_ONLY ───────────► wide-column adapter          │
//! │                                               │                      │
//! │              reads: primary only              │ writes: primary sync │
//! │                                               ▼   secondary queued   │
//! │                                      replication worker ──► ErrorLog │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers only ever observe primary-store failures; replication health is
//! visible solely through the operational surface (error log, consistency
//! reports, statistics).

pub mod dual_write;
pub mod error_log;
pub mod phase;
pub mod replication;
pub mod router;
pub mod verify;

#[cfg(test)]
mod tests;

pub use dual_write::DualWrite;
pub use error_log::{ErrorLog, ErrorLogEntry};
pub use phase::MigrationPhase;
pub use replication::ReplicationHandle;
pub use router::{MigrationRouter, RouterStores, Statistics, StoreCounts, StorePair};
pub use verify::{ConsistencyReport, ConsistencyVerifier, Discrepancy};
