//! The repository contract consumed by every domain service.
//!
//! Both store adapters and the dual-write coordinator implement these traits,
//! so a caller holding an `Arc<dyn ProductRepository>` cannot tell whether it
//! is talking to one store or to a coordinated pair. All operations are
//! asynchronous and resolve with a value or fail with a
//! [`StoreError`](crate::error::StoreError).

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::{Category, Entity, Order, Product, Review, User};
use crate::error::Result;
use crate::page::{Page, PageRequest};

/// A fresh record id. Reviews and other owned sub-records share the format.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Assign a fresh UUID when the entity arrives without one. A caller-supplied
/// id is honored so replication preserves identity across stores.
pub fn assign_id<E: Entity>(entity: &mut E) {
    if entity.id().is_empty() {
        entity.set_id(new_id());
    }
}

/// Base CRUD contract, uniform across entity kinds.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<E>;

    /// List entities matching `filter`, paginated over the filtered set.
    ///
    /// Adapters use a secondary index when the filter is index-eligible;
    /// otherwise this is a full scan filtered by entity type — the expensive
    /// fallback. Callers that need efficient listing must supply an
    /// index-eligible filter.
    async fn find_all(&self, filter: &E::Filter, page: PageRequest) -> Result<Page<E>>;

    async fn create(&self, entity: E) -> Result<E>;
    async fn update(&self, id: &str, patch: E::Patch) -> Result<E>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait ProductRepository: Repository<Product> {
    /// Adjust stock by `delta` as one conditional update; fails with
    /// `InsufficientStock` when the result would go negative, leaving the
    /// record untouched.
    async fn update_stock(&self, id: &str, delta: i64) -> Result<Product>;

    /// Attach a review and recompute the persisted rating aggregates.
    async fn add_review(&self, product_id: &str, review: Review) -> Result<Product>;

    /// Remove a review and recompute the persisted rating aggregates.
    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<Product>;

    async fn find_by_category(&self, category_id: &str, page: PageRequest)
        -> Result<Page<Product>>;

    /// Case-insensitive keyword search over raw and diacritic-folded text.
    async fn search(&self, keyword: &str) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait OrderRepository: Repository<Order> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>>;

    /// Lookup by the human-facing order code.
    async fn find_by_code(&self, order_code: &str) -> Result<Order>;
}

#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn find_by_email(&self, email: &str) -> Result<User>;
}

#[async_trait]
pub trait CategoryRepository: Repository<Category> {
    async fn find_by_slug(&self, slug: &str) -> Result<Category>;
}
