//! Integration tests for the complete migration pipeline
//!
//! These tests walk the full lifecycle across crates:
//! - seed the document store → dual-write → backfill → verify
//! - flip the primary → verify again → cut over to the wide-column store
//! - confirm every query pattern survives the cutover
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use shopfront_core::entity::{
    Category, Entity, EntityKind, Order, OrderItem, OrderPatch, OrderStatus, Product, Review, User,
};
use shopfront_core::page::PageRequest;
use shopfront_core::repository::{
    CategoryRepository, OrderRepository, ProductRepository, Repository, UserRepository,
};
use shopfront_docstore::{DocumentAdapter, DocumentDb};
use shopfront_migration::{MigrationPhase, MigrationRouter, RouterStores, StorePair};
use shopfront_widecol::{MapperConfig, WideColumnAdapter, WideColumnTable};

// ============================================================================
// Wiring
// ============================================================================

struct Env {
    router: MigrationRouter,
    doc_products: Arc<dyn ProductRepository>,
    wide_products: Arc<dyn ProductRepository>,
    doc_orders: Arc<dyn OrderRepository>,
    wide_orders: Arc<dyn OrderRepository>,
    doc_users: Arc<dyn UserRepository>,
    wide_users: Arc<dyn UserRepository>,
    doc_categories: Arc<dyn CategoryRepository>,
    wide_categories: Arc<dyn CategoryRepository>,
}

fn env(initial: MigrationPhase) -> Env {
    let db = Arc::new(DocumentDb::new());
    let table = Arc::new(WideColumnTable::new());
    let cfg = MapperConfig::default();

    let doc_products: Arc<dyn ProductRepository> =
        Arc::new(DocumentAdapter::<Product>::new(Arc::clone(&db)));
    let wide_products: Arc<dyn ProductRepository> = Arc::new(WideColumnAdapter::<Product>::new(
        Arc::clone(&table),
        cfg.clone(),
    ));
    let doc_orders: Arc<dyn OrderRepository> =
        Arc::new(DocumentAdapter::<Order>::new(Arc::clone(&db)));
    let wide_orders: Arc<dyn OrderRepository> = Arc::new(WideColumnAdapter::<Order>::new(
        Arc::clone(&table),
        cfg.clone(),
    ));
    let doc_users: Arc<dyn UserRepository> =
        Arc::new(DocumentAdapter::<User>::new(Arc::clone(&db)));
    let wide_users: Arc<dyn UserRepository> = Arc::new(WideColumnAdapter::<User>::new(
        Arc::clone(&table),
        cfg.clone(),
    ));
    let doc_categories: Arc<dyn CategoryRepository> =
        Arc::new(DocumentAdapter::<Category>::new(Arc::clone(&db)));
    let wide_categories: Arc<dyn CategoryRepository> =
        Arc::new(WideColumnAdapter::<Category>::new(Arc::clone(&table), cfg));

    let stores = RouterStores {
        products: StorePair::new(Arc::clone(&doc_products), Arc::clone(&wide_products)),
        orders: StorePair::new(Arc::clone(&doc_orders), Arc::clone(&wide_orders)),
        users: StorePair::new(Arc::clone(&doc_users), Arc::clone(&wide_users)),
        categories: StorePair::new(Arc::clone(&doc_categories), Arc::clone(&wide_categories)),
    };

    Env {
        router: MigrationRouter::new(stores, initial),
        doc_products,
        wide_products,
        doc_orders,
        wide_orders,
        doc_users,
        wide_users,
        doc_categories,
        wide_categories,
    }
}

/// Copy every record of one kind from the document store into the
/// wide-column store, preserving ids. This is the offline backfill step run
/// once per kind before the verifier is trusted.
async fn backfill<E, R>(document: &Arc<R>, wide: &Arc<R>)
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    let page = document
        .find_all(&E::Filter::default(), PageRequest::all())
        .await
        .unwrap();
    for entity in page.items {
        wide.create(entity).await.unwrap();
    }
}

async fn backfill_all(env: &Env) {
    backfill::<Product, dyn ProductRepository>(&env.doc_products, &env.wide_products).await;
    backfill::<Order, dyn OrderRepository>(&env.doc_orders, &env.wide_orders).await;
    backfill::<User, dyn UserRepository>(&env.doc_users, &env.wide_users).await;
    backfill::<Category, dyn CategoryRepository>(&env.doc_categories, &env.wide_categories).await;
}

struct Seeded {
    category_id: String,
    user_id: String,
    shirt_id: String,
    order_code: String,
}

/// Legacy traffic: write a small catalog through the router while only the
/// document store is live.
async fn seed_legacy(router: &MigrationRouter) -> Seeded {
    let category = router
        .categories()
        .create(Category::new("Thời Trang", "thoi-trang"))
        .await
        .unwrap();
    let user = router
        .users()
        .create(User::new("Linh@Example.com", "Linh"))
        .await
        .unwrap();

    let mut shirt = Product::new("Áo Thun Cotton", 120_000, 40, &category.id);
    shirt.image = Some("https://assets.shopfront.dev/products/ao-thun.jpg".to_string());
    let shirt = router.products().create(shirt).await.unwrap();
    router
        .products()
        .add_review(&shirt.id, Review::new(&user.id, 5, "tốt"))
        .await
        .unwrap();
    router
        .products()
        .create(Product::new("Nón Lá", 60_000, 15, &category.id))
        .await
        .unwrap();

    let order = router
        .orders()
        .create(Order::new(
            &user.id,
            "SF-2026-000042",
            vec![OrderItem {
                product_id: shirt.id.clone(),
                name: shirt.name.clone(),
                price: shirt.price,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();

    Seeded {
        category_id: category.id,
        user_id: user.id,
        shirt_id: shirt.id,
        order_code: order.order_code,
    }
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[tokio::test]
async fn full_migration_lifecycle() {
    let env = env(MigrationPhase::DocumentOnly);
    let seeded = seed_legacy(&env.router).await;

    // Legacy state: the wide-column store has never been written.
    let stats = env.router.statistics().await.unwrap();
    assert_eq!(stats.document.total(), 5);
    assert_eq!(stats.wide_column.total(), 0);

    // Start dual-writing, then backfill what predates it.
    env.router
        .set_phase(MigrationPhase::DualWriteDocumentPrimary);
    backfill_all(&env).await;

    for report in env.router.verify_consistency_all(0).await.unwrap() {
        assert!(report.is_consistent(), "{report:?}");
        assert!(report.sampled > 0, "{:?} sampled nothing", report.kind);
    }

    // Live traffic during dual-write lands in both stores.
    let sold = env
        .router
        .products()
        .update_stock(&seeded.shirt_id, -2)
        .await
        .unwrap();
    assert_eq!(sold.stock, 38);
    env.router.flush_replication().await;
    assert_eq!(
        env.wide_products
            .find_by_id(&seeded.shirt_id)
            .await
            .unwrap()
            .stock,
        38
    );

    // Flip the primary; writes now replicate back into the document store.
    env.router
        .set_phase(MigrationPhase::DualWriteWideColumnPrimary);
    let order = env
        .router
        .orders()
        .find_by_code(&seeded.order_code)
        .await
        .unwrap();
    env.router
        .orders()
        .update(
            &order.id,
            OrderPatch {
                status: Some(OrderStatus::Paid),
            },
        )
        .await
        .unwrap();
    env.router.flush_replication().await;
    assert_eq!(
        env.doc_orders.find_by_id(&order.id).await.unwrap().status,
        OrderStatus::Paid
    );

    let report = env
        .router
        .verify_consistency_kind(EntityKind::Order, 0)
        .await
        .unwrap();
    assert!(report.is_consistent(), "{report:?}");

    // Cut over. The document store is out of the request path for good.
    env.router.set_phase(MigrationPhase::WideColumnOnly);
    assert!(env.router.error_log().is_empty());

    let stats = env.router.statistics().await.unwrap();
    assert_eq!(stats.phase, MigrationPhase::WideColumnOnly);
    assert_eq!(stats.wide_column.total(), stats.document.total());
}

// ============================================================================
// Query patterns after cutover
// ============================================================================

#[tokio::test]
async fn every_query_pattern_survives_cutover() {
    let env = env(MigrationPhase::DocumentOnly);
    let seeded = seed_legacy(&env.router).await;

    env.router
        .set_phase(MigrationPhase::DualWriteDocumentPrimary);
    backfill_all(&env).await;
    env.router.set_phase(MigrationPhase::WideColumnOnly);

    // Diacritic-insensitive search against the migrated store.
    let hits = env.router.products().search("ao thun").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, seeded.shirt_id);
    // The asset URL survives the relative-path round trip.
    assert_eq!(
        hits[0].image.as_deref(),
        Some("https://assets.shopfront.dev/products/ao-thun.jpg")
    );
    // Review aggregates were carried over with the owned reviews.
    assert_eq!(hits[0].review_count, 1);
    assert!((hits[0].rating - 5.0).abs() < f64::EPSILON);

    let in_category = env
        .router
        .products()
        .find_by_category(&seeded.category_id, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(in_category.total, 2);

    let user = env
        .router
        .users()
        .find_by_email("linh@example.com")
        .await
        .unwrap();
    assert_eq!(user.id, seeded.user_id);

    let orders = env
        .router
        .orders()
        .find_by_user(&seeded.user_id)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_code, seeded.order_code);
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[0].total, 240_000);

    let by_code = env
        .router
        .orders()
        .find_by_code(&seeded.order_code)
        .await
        .unwrap();
    assert_eq!(by_code.id, orders[0].id);

    let category = env
        .router
        .categories()
        .find_by_slug("thoi-trang")
        .await
        .unwrap();
    assert_eq!(category.id, seeded.category_id);
}
