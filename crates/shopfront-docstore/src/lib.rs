//! Document-store side of the storefront.
//!
//! [`DocumentDb`] is a small in-process document database: named collections
//! of JSON documents keyed by id, guarded by one `parking_lot` lock per
//! database with closure-based atomic mutation. [`DocumentAdapter`] puts the
//! repository contract on top of it — entities serialize to documents
//! unchanged, relations stay nested (reviews inside the product document,
//! line items inside the order document).

pub mod adapter;
pub mod engine;

pub use adapter::DocumentAdapter;
pub use engine::DocumentDb;
