//! Phase-controlled repository router.
//!
//! The single injection point for domain services: they ask the router for a
//! repository per call and never hold one across requests, so a phase change
//! takes effect on the very next call. One phase value covers every entity
//! kind; per-kind phasing is not supported.
//!
//! Phase changes are not sequenced against in-flight calls. A request that
//! fetched its repository just before `set_phase` completes against the old
//! phase's stores; during dual-write phases that is harmless because both
//! stores receive every write anyway. Any phase may be set from any other
//! phase — skipping dual-write entirely is an operator decision, not an
//! error.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use shopfront_core::entity::{Category, EntityKind, Order, Product, User};
use shopfront_core::error::Result;
use shopfront_core::repository::{
    CategoryRepository, OrderRepository, ProductRepository, Repository, UserRepository,
};
use shopfront_docstore::{DocumentAdapter, DocumentDb};
use shopfront_widecol::{MapperConfig, WideColumnAdapter, WideColumnTable};

use crate::dual_write::DualWrite;
use crate::error_log::{ErrorLog, ErrorLogEntry};
use crate::phase::MigrationPhase;
use crate::replication::ReplicationHandle;
use crate::verify::{ConsistencyReport, ConsistencyVerifier};

// ============================================================================
// Store wiring
// ============================================================================

/// The two physical stores behind one entity kind.
pub struct StorePair<R: ?Sized> {
    pub document: Arc<R>,
    pub wide: Arc<R>,
}

impl<R: ?Sized> StorePair<R> {
    pub fn new(document: Arc<R>, wide: Arc<R>) -> Self {
        Self { document, wide }
    }
}

impl<R: ?Sized> Clone for StorePair<R> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            wide: Arc::clone(&self.wide),
        }
    }
}

/// Every store pair the router needs, one per entity kind.
#[derive(Clone)]
pub struct RouterStores {
    pub products: StorePair<dyn ProductRepository>,
    pub orders: StorePair<dyn OrderRepository>,
    pub users: StorePair<dyn UserRepository>,
    pub categories: StorePair<dyn CategoryRepository>,
}

/// One prebuilt repository per phase. Building all four up front makes
/// `select` a lock-free `Arc` clone on the hot path.
struct PhasedRepos<R: ?Sized> {
    document: Arc<R>,
    dual_document_primary: Arc<R>,
    dual_wide_primary: Arc<R>,
    wide: Arc<R>,
}

impl<R: ?Sized> PhasedRepos<R> {
    fn select(&self, phase: MigrationPhase) -> Arc<R> {
        match phase {
            MigrationPhase::DocumentOnly => Arc::clone(&self.document),
            MigrationPhase::DualWriteDocumentPrimary => Arc::clone(&self.dual_document_primary),
            MigrationPhase::DualWriteWideColumnPrimary => Arc::clone(&self.dual_wide_primary),
            MigrationPhase::WideColumnOnly => Arc::clone(&self.wide),
        }
    }
}

macro_rules! phased {
    ($pair:expr, $handle:expr) => {{
        let pair = $pair;
        PhasedRepos {
            document: Arc::clone(&pair.document),
            dual_document_primary: Arc::new(DualWrite::new(
                Arc::clone(&pair.document),
                Arc::clone(&pair.wide),
                $handle.clone(),
            )),
            dual_wide_primary: Arc::new(DualWrite::new(
                Arc::clone(&pair.wide),
                Arc::clone(&pair.document),
                $handle.clone(),
            )),
            wide: Arc::clone(&pair.wide),
        }
    }};
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreCounts {
    pub products: usize,
    pub orders: usize,
    pub users: usize,
    pub categories: usize,
}

impl StoreCounts {
    pub fn total(&self) -> usize {
        self.products + self.orders + self.users + self.categories
    }
}

/// Operator-facing snapshot. Counts come straight from each physical store,
/// so a document/wide gap here is replication lag made visible.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub phase: MigrationPhase,
    pub document: StoreCounts,
    pub wide_column: StoreCounts,
    pub error_count: usize,
}

// ============================================================================
// Router
// ============================================================================

pub struct MigrationRouter {
    phase: RwLock<MigrationPhase>,
    products: PhasedRepos<dyn ProductRepository>,
    orders: PhasedRepos<dyn OrderRepository>,
    users: PhasedRepos<dyn UserRepository>,
    categories: PhasedRepos<dyn CategoryRepository>,
    verifier: ConsistencyVerifier,
    stores: RouterStores,
    error_log: Arc<ErrorLog>,
    replication: ReplicationHandle,
}

impl MigrationRouter {
    /// Wire a router over explicit store pairs. Must be called within a
    /// tokio runtime: the replication worker is spawned here.
    pub fn new(stores: RouterStores, initial: MigrationPhase) -> Self {
        let error_log = Arc::new(ErrorLog::new());
        let replication = ReplicationHandle::spawn(Arc::clone(&error_log));
        let verifier = ConsistencyVerifier::new(
            stores.products.clone(),
            stores.orders.clone(),
            stores.users.clone(),
            stores.categories.clone(),
        );
        Self {
            phase: RwLock::new(initial),
            products: phased!(&stores.products, replication),
            orders: phased!(&stores.orders, replication),
            users: phased!(&stores.users, replication),
            categories: phased!(&stores.categories, replication),
            verifier,
            stores,
            error_log,
            replication,
        }
    }

    /// Wire a router straight over the two storage engines, building one
    /// adapter pair per entity kind.
    pub fn with_engines(
        db: Arc<DocumentDb>,
        table: Arc<WideColumnTable>,
        cfg: MapperConfig,
        initial: MigrationPhase,
    ) -> Self {
        let stores = RouterStores {
            products: StorePair::new(
                Arc::new(DocumentAdapter::<Product>::new(Arc::clone(&db))),
                Arc::new(WideColumnAdapter::<Product>::new(
                    Arc::clone(&table),
                    cfg.clone(),
                )),
            ),
            orders: StorePair::new(
                Arc::new(DocumentAdapter::<Order>::new(Arc::clone(&db))),
                Arc::new(WideColumnAdapter::<Order>::new(
                    Arc::clone(&table),
                    cfg.clone(),
                )),
            ),
            users: StorePair::new(
                Arc::new(DocumentAdapter::<User>::new(Arc::clone(&db))),
                Arc::new(WideColumnAdapter::<User>::new(
                    Arc::clone(&table),
                    cfg.clone(),
                )),
            ),
            categories: StorePair::new(
                Arc::new(DocumentAdapter::<Category>::new(Arc::clone(&db))),
                Arc::new(WideColumnAdapter::<Category>::new(Arc::clone(&table), cfg)),
            ),
        };
        Self::new(stores, initial)
    }

    // ------------------------------------------------------------------
    // Phase control
    // ------------------------------------------------------------------

    pub fn current_phase(&self) -> MigrationPhase {
        *self.phase.read()
    }

    pub fn set_phase(&self, phase: MigrationPhase) {
        let previous = {
            let mut guard = self.phase.write();
            std::mem::replace(&mut *guard, phase)
        };
        tracing::info!(from = %previous, to = %phase, "migration phase changed");
    }

    /// Parse and apply a phase name from the operational surface. An unknown
    /// name fails with `InvalidPhase` and leaves the current phase untouched.
    pub fn set_phase_str(&self, value: &str) -> Result<MigrationPhase> {
        let phase = MigrationPhase::parse(value)?;
        self.set_phase(phase);
        Ok(phase)
    }

    // ------------------------------------------------------------------
    // Repository selection
    // ------------------------------------------------------------------

    pub fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.select(self.current_phase())
    }

    pub fn orders(&self) -> Arc<dyn OrderRepository> {
        self.orders.select(self.current_phase())
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        self.users.select(self.current_phase())
    }

    pub fn categories(&self) -> Arc<dyn CategoryRepository> {
        self.categories.select(self.current_phase())
    }

    // ------------------------------------------------------------------
    // Operational surface
    // ------------------------------------------------------------------

    /// Verify the product catalog after draining the replication queue, so
    /// the report reflects settled state rather than in-flight writes.
    pub async fn verify_consistency(&self, sample: u32) -> Result<ConsistencyReport> {
        self.verify_consistency_kind(EntityKind::Product, sample)
            .await
    }

    pub async fn verify_consistency_kind(
        &self,
        kind: EntityKind,
        sample: u32,
    ) -> Result<ConsistencyReport> {
        self.replication.flush().await;
        match self.verifier.verify_kind(kind, sample).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.error_log.record(
                    "verify",
                    serde_json::json!({ "kind": kind.type_tag(), "sample": sample }),
                    &err,
                );
                Err(err)
            }
        }
    }

    /// One report per entity kind, products first.
    pub async fn verify_consistency_all(&self, sample: u32) -> Result<Vec<ConsistencyReport>> {
        self.replication.flush().await;
        self.verifier.verify_all(sample).await
    }

    pub fn error_log(&self) -> Vec<ErrorLogEntry> {
        self.error_log.entries()
    }

    pub fn error_count(&self) -> usize {
        self.error_log.len()
    }

    pub fn clear_error_log(&self) {
        self.error_log.clear();
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        let stores = &self.stores;
        let document = StoreCounts {
            products: stores.products.document.count().await?,
            orders: stores.orders.document.count().await?,
            users: stores.users.document.count().await?,
            categories: stores.categories.document.count().await?,
        };
        let wide_column = StoreCounts {
            products: stores.products.wide.count().await?,
            orders: stores.orders.wide.count().await?,
            users: stores.users.wide.count().await?,
            categories: stores.categories.wide.count().await?,
        };
        Ok(Statistics {
            phase: self.current_phase(),
            document,
            wide_column,
            error_count: self.error_log.len(),
        })
    }

    /// Wait until every queued secondary write has been applied (or logged).
    pub async fn flush_replication(&self) {
        self.replication.flush().await;
    }
}
