//! End-to-end tests over the router, coordinator and verifier wired to the
//! real in-process store engines.

use std::sync::Arc;

use async_trait::async_trait;

use shopfront_core::entity::{Category, EntityKind, Order, Product, Review, User};
use shopfront_core::error::{Result, StoreError};
use shopfront_core::page::{Page, PageRequest};
use shopfront_core::repository::{ProductRepository, Repository};
use shopfront_docstore::{DocumentAdapter, DocumentDb};
use shopfront_widecol::{MapperConfig, WideColumnAdapter, WideColumnTable};

use crate::phase::MigrationPhase;
use crate::router::{MigrationRouter, RouterStores, StorePair};
use crate::verify::Discrepancy;

// ============================================================================
// Fixtures
// ============================================================================

/// A product store that fails every call. Standing in for an unreachable
/// backend: any read routed here is a routing bug, and any write routed here
/// must surface through the error log, never through the caller.
struct UnreachableStore;

fn down(operation: &str) -> StoreError {
    StoreError::Replication {
        operation: operation.to_string(),
        message: "store unreachable".to_string(),
    }
}

#[async_trait]
impl Repository<Product> for UnreachableStore {
    async fn find_by_id(&self, _id: &str) -> Result<Product> {
        Err(down("find_by_id"))
    }
    async fn find_all(
        &self,
        _filter: &<Product as shopfront_core::entity::Entity>::Filter,
        _page: PageRequest,
    ) -> Result<Page<Product>> {
        Err(down("find_all"))
    }
    async fn create(&self, _entity: Product) -> Result<Product> {
        Err(down("create"))
    }
    async fn update(
        &self,
        _id: &str,
        _patch: <Product as shopfront_core::entity::Entity>::Patch,
    ) -> Result<Product> {
        Err(down("update"))
    }
    async fn delete(&self, _id: &str) -> Result<()> {
        Err(down("delete"))
    }
    async fn count(&self) -> Result<usize> {
        Err(down("count"))
    }
}

#[async_trait]
impl ProductRepository for UnreachableStore {
    async fn update_stock(&self, _id: &str, _delta: i64) -> Result<Product> {
        Err(down("update_stock"))
    }
    async fn add_review(&self, _product_id: &str, _review: Review) -> Result<Product> {
        Err(down("add_review"))
    }
    async fn delete_review(&self, _product_id: &str, _review_id: &str) -> Result<Product> {
        Err(down("delete_review"))
    }
    async fn find_by_category(
        &self,
        _category_id: &str,
        _page: PageRequest,
    ) -> Result<Page<Product>> {
        Err(down("find_by_category"))
    }
    async fn search(&self, _keyword: &str) -> Result<Vec<Product>> {
        Err(down("search"))
    }
}

struct TestEnv {
    router: MigrationRouter,
    doc_products: Arc<DocumentAdapter<Product>>,
    wide_products: Arc<WideColumnAdapter<Product>>,
}

/// Full wiring over both engines, with direct handles on the product
/// adapters so tests can inspect or skew either store behind the router's
/// back.
fn env(initial: MigrationPhase) -> TestEnv {
    let db = Arc::new(DocumentDb::new());
    let table = Arc::new(WideColumnTable::new());
    let cfg = MapperConfig::default();

    let doc_products = Arc::new(DocumentAdapter::<Product>::new(Arc::clone(&db)));
    let wide_products = Arc::new(WideColumnAdapter::<Product>::new(
        Arc::clone(&table),
        cfg.clone(),
    ));

    let stores = RouterStores {
        products: StorePair::new(
            Arc::clone(&doc_products) as Arc<dyn ProductRepository>,
            Arc::clone(&wide_products) as Arc<dyn ProductRepository>,
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

    TestEnv {
        router: MigrationRouter::new(stores, initial),
        doc_products,
        wide_products,
    }
}

/// Wiring where the wide-column product store is unreachable. Everything
/// must still work as long as no call is routed there.
fn env_with_unreachable_secondary(
    initial: MigrationPhase,
) -> (MigrationRouter, Arc<DocumentAdapter<Product>>) {
    let db = Arc::new(DocumentDb::new());
    let table = Arc::new(WideColumnTable::new());
    let cfg = MapperConfig::default();

    let doc_products = Arc::new(DocumentAdapter::<Product>::new(Arc::clone(&db)));
    let stores = RouterStores {
        products: StorePair::new(
            Arc::clone(&doc_products) as Arc<dyn ProductRepository>,
            Arc::new(UnreachableStore),
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
    (MigrationRouter::new(stores, initial), doc_products)
}

fn sample_product(name: &str) -> Product {
    Product::new(name, 150_000, 10, "cat-1")
}

// ============================================================================
// Phase control
// ============================================================================

#[tokio::test]
async fn unknown_phase_name_is_rejected_and_phase_unchanged() {
    let env = env(MigrationPhase::DocumentOnly);
    let err = env.router.set_phase_str("BOGUS").unwrap_err();
    assert!(matches!(err, StoreError::InvalidPhase(value) if value == "BOGUS"));
    assert_eq!(env.router.current_phase(), MigrationPhase::DocumentOnly);

    let phase = env
        .router
        .set_phase_str("DUAL_WRITE_DOCUMENT_PRIMARY")
        .unwrap();
    assert_eq!(phase, MigrationPhase::DualWriteDocumentPrimary);
    assert_eq!(env.router.current_phase(), phase);
}

#[tokio::test]
async fn phase_change_reroutes_the_next_read() {
    let env = env(MigrationPhase::DocumentOnly);
    let created = env.router.products().create(sample_product("Nón Lá")).await.unwrap();

    // Only the document store has the record; cutting over exposes the gap.
    env.router.set_phase(MigrationPhase::WideColumnOnly);
    let err = env.router.products().find_by_id(&created.id).await.unwrap_err();
    assert!(err.is_not_found());

    env.router.set_phase(MigrationPhase::DocumentOnly);
    assert!(env.router.products().find_by_id(&created.id).await.is_ok());
}

// ============================================================================
// Read and write routing
// ============================================================================

#[tokio::test]
async fn reads_never_touch_the_secondary_store() {
    let (router, doc) = env_with_unreachable_secondary(MigrationPhase::DualWriteDocumentPrimary);
    let created = doc.create(sample_product("Áo Thun")).await.unwrap();

    // Every read path resolves although the secondary fails every call.
    let repo = router.products();
    assert!(repo.find_by_id(&created.id).await.is_ok());
    assert_eq!(
        repo.find_all(&Default::default(), PageRequest::all())
            .await
            .unwrap()
            .total,
        1
    );
    assert_eq!(repo.search("thun").await.unwrap().len(), 1);
    assert_eq!(
        repo.find_by_category("cat-1", PageRequest::all())
            .await
            .unwrap()
            .total,
        1
    );
}

#[tokio::test]
async fn dual_write_applies_the_write_to_both_stores() {
    let env = env(MigrationPhase::DualWriteDocumentPrimary);
    let created = env.router.products().create(sample_product("Bàn Gỗ")).await.unwrap();
    env.router.flush_replication().await;

    let replica = env.wide_products.find_by_id(&created.id).await.unwrap();
    assert_eq!(replica.name, "Bàn Gỗ");
    assert_eq!(env.doc_products.count().await.unwrap(), 1);
    assert_eq!(env.wide_products.count().await.unwrap(), 1);
    assert!(env.router.error_log().is_empty());
}

#[tokio::test]
async fn review_and_stock_writes_replicate_with_identical_ids() {
    let env = env(MigrationPhase::DualWriteDocumentPrimary);
    let created = env.router.products().create(sample_product("Đèn Bàn")).await.unwrap();

    let repo = env.router.products();
    let after_review = repo
        .add_review(&created.id, Review::new("u1", 4, "ổn"))
        .await
        .unwrap();
    repo.update_stock(&created.id, -3).await.unwrap();
    env.router.flush_replication().await;

    let replica = env.wide_products.find_by_id(&created.id).await.unwrap();
    assert_eq!(replica.stock, 7);
    assert_eq!(replica.review_count, 1);
    // The review id was fixed before the primary write, so both stores agree.
    assert_eq!(replica.reviews[0].id, after_review.reviews[0].id);
}

#[tokio::test]
async fn secondary_failure_is_logged_but_never_surfaced() {
    let (router, _doc) = env_with_unreachable_secondary(MigrationPhase::DualWriteDocumentPrimary);

    // The caller sees a clean create even though replication cannot work.
    let created = router.products().create(sample_product("Ghế Nhựa")).await.unwrap();
    assert!(!created.id.is_empty());

    router.flush_replication().await;
    let entries = router.error_log();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, "create");
    assert_eq!(entries[0].arguments["id"], created.id.as_str());

    router.clear_error_log();
    assert_eq!(router.error_count(), 0);
}

// ============================================================================
// Verifier and statistics
// ============================================================================

#[tokio::test]
async fn verifier_flags_drift_and_missing_records() {
    let env = env(MigrationPhase::DualWriteDocumentPrimary);
    let repo = env.router.products();
    let first = repo.create(sample_product("Tủ Lạnh")).await.unwrap();
    let second = repo.create(sample_product("Máy Giặt")).await.unwrap();

    let report = env.router.verify_consistency(10).await.unwrap();
    assert_eq!(report.kind, EntityKind::Product);
    assert_eq!(report.sampled, 2);
    assert!(report.is_consistent());

    // Skew the stores behind the router's back: drift one field, drop one
    // record from the wide-column side entirely.
    env.doc_products.update_stock(&first.id, -4).await.unwrap();
    env.wide_products.delete(&second.id).await.unwrap();

    let report = env.router.verify_consistency(10).await.unwrap();
    assert_eq!(report.mismatched, 2);
    assert_eq!(report.matched, 0);

    let mut saw_stock_drift = false;
    let mut saw_missing = false;
    for discrepancy in &report.discrepancies {
        match discrepancy {
            Discrepancy::FieldMismatch {
                id,
                field,
                document,
                wide,
            } => {
                assert_eq!(id, &first.id);
                assert_eq!(*field, "stock");
                // The report carries both store values, not just the verdict.
                assert_eq!(document, &serde_json::json!(6));
                assert_eq!(wide, &serde_json::json!(10));
                saw_stock_drift = true;
            }
            Discrepancy::Missing { id } => {
                assert_eq!(id, &second.id);
                saw_missing = true;
            }
        }
    }
    assert!(saw_stock_drift && saw_missing);
}

#[tokio::test]
async fn statistics_expose_counts_phase_and_errors() {
    let env = env(MigrationPhase::DocumentOnly);
    env.router.products().create(sample_product("Quạt Trần")).await.unwrap();

    // DOCUMENT_ONLY never touches the wide-column store.
    let stats = env.router.statistics().await.unwrap();
    assert_eq!(stats.phase, MigrationPhase::DocumentOnly);
    assert_eq!(stats.document.products, 1);
    assert_eq!(stats.wide_column.products, 0);
    assert_eq!(stats.document.total(), 1);
    assert_eq!(stats.error_count, 0);
}
