//! Sample catalog used by every CLI command.
//!
//! The stores are in-process, so each invocation starts from the same seed:
//! two categories, two users, five products (one with a review) and two
//! orders, all written through the router while it is in the given phase.

use anyhow::Result;

use shopfront_core::entity::{Category, Order, OrderItem, Product, Review, User};
use shopfront_core::repository::{ProductRepository, Repository};
use shopfront_migration::{MigrationPhase, MigrationRouter};
use shopfront_widecol::MapperConfig;

pub async fn seeded_router(phase: MigrationPhase) -> Result<MigrationRouter> {
    let db = std::sync::Arc::new(shopfront_docstore::DocumentDb::new());
    let table = std::sync::Arc::new(shopfront_widecol::WideColumnTable::new());
    let router = MigrationRouter::with_engines(db, table, MapperConfig::default(), phase);
    seed(&router).await?;
    router.flush_replication().await;
    Ok(router)
}

async fn seed(router: &MigrationRouter) -> Result<()> {
    let categories = router.categories();
    let apparel = categories
        .create(Category::new("Thời Trang", "thoi-trang"))
        .await?;
    let home = categories.create(Category::new("Nhà Cửa", "nha-cua")).await?;

    let users = router.users();
    let linh = users.create(User::new("linh@example.com", "Linh")).await?;
    users.create(User::new("minh@example.com", "Minh")).await?;

    let products = router.products();
    let mut shirt = Product::new("Áo Thun Cotton", 120_000, 40, &apparel.id);
    shirt.description = "Áo thun cotton 100%".to_string();
    shirt.sku = "AT-001".to_string();
    shirt.image = Some("https://assets.shopfront.dev/products/ao-thun.jpg".to_string());
    let shirt = products.create(shirt).await?;
    products
        .add_review(&shirt.id, Review::new(&linh.id, 5, "Vải đẹp, giao nhanh"))
        .await?;

    products
        .create(Product::new("Nón Lá", 60_000, 15, &apparel.id))
        .await?;
    products
        .create(Product::new("Bàn Gỗ Sồi", 2_450_000, 3, &home.id))
        .await?;
    products
        .create(Product::new("Đèn Bàn LED", 320_000, 0, &home.id))
        .await?;
    let towel = products
        .create(Product::new("Khăn Tắm", 85_000, 60, &home.id))
        .await?;

    let orders = router.orders();
    orders
        .create(Order::new(
            &linh.id,
            "SF-2026-000001",
            vec![OrderItem {
                product_id: shirt.id.clone(),
                name: shirt.name.clone(),
                price: shirt.price,
                quantity: 2,
            }],
        ))
        .await?;
    orders
        .create(Order::new(
            &linh.id,
            "SF-2026-000002",
            vec![OrderItem {
                product_id: towel.id.clone(),
                name: towel.name.clone(),
                price: towel.price,
                quantity: 1,
            }],
        ))
        .await?;

    Ok(())
}
