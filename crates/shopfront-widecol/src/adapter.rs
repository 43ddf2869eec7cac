//! Wide-column adapter implementing the repository contract.
//!
//! Query routing: an index-eligible filter goes through the matching
//! secondary index; everything else is a full-table scan filtered by
//! `entity_type` — the expensive fallback path. Callers that need efficient
//! listing must supply an index-eligible filter.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use shopfront_core::entity::{Category, Entity, EntityFilter, Order, Product, Review, User};
use shopfront_core::error::{Result, StoreError};
use shopfront_core::page::{paginate, Page, PageRequest};
use shopfront_core::repository::{
    assign_id, new_id, CategoryRepository, OrderRepository, ProductRepository, Repository,
    UserRepository,
};
use shopfront_core::text::fold_diacritics;

use crate::item::{IndexName, Item, METADATA_SK};
use crate::mapper::{partition_key, MapperConfig, WideColumnEntity};
use crate::table::WideColumnTable;

// ============================================================================
// Adapter
// ============================================================================

#[derive(Debug)]
pub struct WideColumnAdapter<E: WideColumnEntity> {
    table: Arc<WideColumnTable>,
    cfg: MapperConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: WideColumnEntity> WideColumnAdapter<E> {
    pub fn new(table: Arc<WideColumnTable>, cfg: MapperConfig) -> Self {
        Self {
            table,
            cfg,
            _entity: PhantomData,
        }
    }

    fn pk(id: &str) -> String {
        partition_key(E::KIND, id)
    }

    /// Rebuild the full entity behind a metadata item by fetching its
    /// partition's children.
    fn hydrate(&self, meta: &Item) -> Result<E> {
        let children: Vec<Item> = self
            .table
            .query_partition(&meta.pk)
            .into_iter()
            .filter(|item| !item.is_metadata())
            .collect();
        E::from_items(meta, &children, &self.cfg)
    }

    fn load(&self, id: &str) -> Result<E> {
        let partition = self.table.query_partition(&Self::pk(id));
        let meta = partition
            .iter()
            .find(|item| item.is_metadata())
            .ok_or_else(|| StoreError::not_found(E::KIND.type_tag(), id))?;
        let children: Vec<Item> = partition
            .iter()
            .filter(|item| !item.is_metadata())
            .cloned()
            .collect();
        E::from_items(meta, &children, &self.cfg)
    }

    fn store(&self, entity: &E) -> Result<()> {
        for item in entity.to_items(&self.cfg)? {
            self.table.put(item);
        }
        Ok(())
    }
}

impl<E: WideColumnEntity> Clone for WideColumnAdapter<E> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.table), self.cfg.clone())
    }
}

fn sort_newest_first<E: Entity>(entities: &mut [E]) {
    entities.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

// ============================================================================
// Base contract
// ============================================================================

#[async_trait]
impl<E: WideColumnEntity> Repository<E> for WideColumnAdapter<E> {
    async fn find_by_id(&self, id: &str) -> Result<E> {
        self.load(id)
    }

    async fn find_all(&self, filter: &E::Filter, page: PageRequest) -> Result<Page<E>> {
        let metas = match E::index_hint(filter) {
            Some((index, partition)) => self.table.query_index(index, &partition),
            // Expensive fallback: full-table scan filtered by entity type.
            None => self.table.scan_type(E::KIND.type_tag()),
        };
        let mut entities: Vec<E> = metas
            .iter()
            .map(|meta| self.hydrate(meta))
            .collect::<Result<_>>()?;
        entities.retain(|entity| filter.matches(entity));
        sort_newest_first(&mut entities);
        Ok(paginate(entities, page))
    }

    async fn create(&self, mut entity: E) -> Result<E> {
        assign_id(&mut entity);
        entity.validate()?;
        let items = entity.to_items(&self.cfg)?;
        let (meta, children) = items
            .split_first()
            .ok_or_else(|| StoreError::validation("mapper produced no items"))?;
        if !self.table.insert(meta.clone()) {
            return Err(StoreError::validation(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            )));
        }
        for child in children {
            self.table.put(child.clone());
        }
        Ok(entity)
    }

    async fn update(&self, id: &str, patch: E::Patch) -> Result<E> {
        let mut entity = self.load(id)?;
        entity.apply_patch(&patch);
        entity.validate()?;
        // Re-mapping recomputes every projection, so a category or price
        // change moves the record to its new index partition.
        self.store(&entity)?;
        Ok(entity)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.table.delete_partition(&Self::pk(id)) == 0 {
            return Err(StoreError::not_found(E::KIND.type_tag(), id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.count_type(E::KIND.type_tag()))
    }
}

// ============================================================================
// Product operations
// ============================================================================

impl WideColumnAdapter<Product> {
    /// Recompute the persisted rating aggregates (and the rating-bearing
    /// index sort key) from the review children of `pk`.
    fn refresh_review_aggregates(&self, pk: &str, id: &str) -> Result<()> {
        let reviews = self.table.query_prefix(pk, "REVIEW#");
        let count = reviews.len();
        let rating = if count == 0 {
            0.0
        } else {
            let sum: i64 = reviews
                .iter()
                .map(|item| item.attr_i64("rating").unwrap_or(0))
                .sum();
            sum as f64 / count as f64
        };
        self.table
            .modify(pk, METADATA_SK, |meta| {
                meta.attributes.insert("rating".into(), rating.into());
                meta.attributes
                    .insert("review_count".into(), (count as u64).into());
                set_updated_at(meta)?;
                if let Some(gsi3) = meta.gsi3.as_mut() {
                    gsi3.sort = format!("RATING#{:06.2}", rating.clamp(0.0, 5.0));
                }
                Ok(())
            })?
            .ok_or_else(|| StoreError::not_found("PRODUCT", id))
    }
}

fn set_updated_at(item: &mut Item) -> Result<()> {
    let now = serde_json::to_value(Utc::now())
        .map_err(|err| StoreError::validation(format!("unserializable timestamp: {err}")))?;
    item.attributes.insert("updated_at".into(), now);
    Ok(())
}

#[async_trait]
impl ProductRepository for WideColumnAdapter<Product> {
    async fn update_stock(&self, id: &str, delta: i64) -> Result<Product> {
        let pk = Self::pk(id);
        // One conditional update under the table lock; no read-modify-write
        // window for concurrent callers to race through.
        self.table
            .modify(&pk, METADATA_SK, |meta| {
                let available = meta
                    .attr_i64("stock")
                    .ok_or_else(|| StoreError::validation("product item has no stock field"))?;
                let new_stock = available + delta;
                if new_stock < 0 {
                    return Err(StoreError::InsufficientStock {
                        id: id.to_string(),
                        available,
                        delta,
                    });
                }
                meta.attributes.insert("stock".into(), new_stock.into());
                set_updated_at(meta)
            })?
            .ok_or_else(|| StoreError::not_found("PRODUCT", id))?;
        self.load(id)
    }

    async fn add_review(&self, product_id: &str, mut review: Review) -> Result<Product> {
        if review.id.is_empty() {
            review.id = new_id();
        }
        review.validate()?;
        let pk = Self::pk(product_id);
        if self.table.get(&pk, METADATA_SK).is_none() {
            return Err(StoreError::not_found("PRODUCT", product_id));
        }
        let attrs = match serde_json::to_value(&review) {
            Ok(Value::Object(map)) => map,
            _ => return Err(StoreError::validation("unserializable review")),
        };
        self.table
            .put(Item::new(pk.clone(), format!("REVIEW#{}", review.id), "REVIEW", attrs));
        self.refresh_review_aggregates(&pk, product_id)?;
        self.load(product_id)
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<Product> {
        let pk = Self::pk(product_id);
        if self.table.get(&pk, METADATA_SK).is_none() {
            return Err(StoreError::not_found("PRODUCT", product_id));
        }
        if !self.table.delete(&pk, &format!("REVIEW#{review_id}")) {
            return Err(StoreError::not_found("REVIEW", review_id));
        }
        self.refresh_review_aggregates(&pk, product_id)?;
        self.load(product_id)
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        // Category index is sorted by lowercased name.
        let metas = self
            .table
            .query_index(IndexName::Gsi1, &format!("CATEGORY#{category_id}"));
        let products: Vec<Product> = metas
            .iter()
            .map(|meta| self.hydrate(meta))
            .collect::<Result<_>>()?;
        Ok(paginate(products, page))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Product>> {
        let lowered = keyword.to_lowercase();
        let folded = fold_diacritics(keyword);
        let mut products: Vec<Product> = self
            .table
            .scan_type("PRODUCT")
            .iter()
            .filter(|meta| {
                let name = meta.attr_str("name").unwrap_or_default();
                let normalized = meta.attr_str("name_normalized").unwrap_or_default();
                let description = meta.attr_str("description").unwrap_or_default();
                name.to_lowercase().contains(&lowered)
                    || normalized.contains(&folded)
                    || description.to_lowercase().contains(&lowered)
                    || fold_diacritics(description).contains(&folded)
            })
            .map(|meta| self.hydrate(meta))
            .collect::<Result<_>>()?;
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }
}

// ============================================================================
// Order / User / Category operations
// ============================================================================

#[async_trait]
impl OrderRepository for WideColumnAdapter<Order> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let metas = self
            .table
            .query_index(IndexName::Gsi1, &format!("USER#{user_id}"));
        let mut orders: Vec<Order> = metas
            .iter()
            .map(|meta| self.hydrate(meta))
            .collect::<Result<_>>()?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Order> {
        let metas = self
            .table
            .query_index(IndexName::Gsi3, &format!("CODE#{order_code}"));
        let meta = metas
            .first()
            .ok_or_else(|| StoreError::not_found("ORDER", order_code))?;
        self.hydrate(meta)
    }
}

#[async_trait]
impl UserRepository for WideColumnAdapter<User> {
    async fn find_by_email(&self, email: &str) -> Result<User> {
        let metas = self
            .table
            .query_index(IndexName::Gsi1, &format!("EMAIL#{}", email.to_lowercase()));
        let meta = metas
            .first()
            .ok_or_else(|| StoreError::not_found("USER", email))?;
        self.hydrate(meta)
    }
}

#[async_trait]
impl CategoryRepository for WideColumnAdapter<Category> {
    async fn find_by_slug(&self, slug: &str) -> Result<Category> {
        let metas = self
            .table
            .query_index(IndexName::Gsi1, &format!("SLUG#{slug}"));
        let meta = metas
            .first()
            .ok_or_else(|| StoreError::not_found("CATEGORY", slug))?;
        self.hydrate(meta)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::entity::{OrderItem, ProductFilter};

    fn products() -> WideColumnAdapter<Product> {
        WideColumnAdapter::new(Arc::new(WideColumnTable::new()), MapperConfig::default())
    }

    #[tokio::test]
    async fn create_and_load_with_reviews() {
        let repo = products();
        let mut product = Product::new("Cà Phê Sữa Đá", 45_000, 10, "drinks");
        product.reviews.push(Review::new("u1", 4, "ổn"));
        product.reviews[0].id = "r1".into();
        product.recompute_review_aggregates();

        let created = repo.create(product).await.unwrap();
        let loaded = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(loaded.name, "Cà Phê Sữa Đá");
        assert_eq!(loaded.reviews.len(), 1);
        assert_eq!(loaded.review_count, 1);
    }

    #[tokio::test]
    async fn create_rejects_unassigned_review_ids() {
        let repo = products();
        let mut product = Product::new("Ấm Trà", 95_000, 4, "kitchen");
        product.reviews.push(Review::new("u1", 5, "thơm"));
        product.reviews.push(Review::new("u2", 3, ""));
        product.recompute_review_aggregates();

        // Two id-less reviews would share the same child key and silently
        // collapse to one; the create must fail instead.
        let err = repo.create(product.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        product.reviews[0].id = "r-1".into();
        product.reviews[1].id = "r-2".into();
        let created = repo.create(product).await.unwrap();
        let loaded = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(loaded.reviews.len(), 2);
    }

    #[tokio::test]
    async fn category_filter_uses_the_index_and_paginates_filtered_set() {
        let repo = products();
        for i in 0..4 {
            repo.create(Product::new(format!("Drink {i}"), 10_000, 1, "drinks"))
                .await
                .unwrap();
        }
        repo.create(Product::new("Chair", 900_000, 1, "furniture"))
            .await
            .unwrap();

        let filter = ProductFilter {
            category_id: Some("drinks".into()),
            ..Default::default()
        };
        let page = repo.find_all(&filter, PageRequest::new(2, 3)).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn update_stock_is_conditional_and_atomic() {
        let repo = products();
        let created = repo
            .create(Product::new("Bánh Mì", 20_000, 3, "food"))
            .await
            .unwrap();
        let err = repo.update_stock(&created.id, -5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                available: 3,
                delta: -5,
                ..
            }
        ));
        assert_eq!(repo.find_by_id(&created.id).await.unwrap().stock, 3);
        assert_eq!(repo.update_stock(&created.id, 7).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn review_lifecycle_maintains_aggregates_and_rating_index() {
        let repo = products();
        let created = repo
            .create(Product::new("Nón Lá", 80_000, 5, "fashion"))
            .await
            .unwrap();
        let after = repo
            .add_review(&created.id, Review::new("u1", 5, ""))
            .await
            .unwrap();
        let review_id = after.reviews[0].id.clone();
        repo.add_review(&created.id, Review::new("u2", 1, ""))
            .await
            .unwrap();

        let meta = repo
            .table
            .get(&format!("PRODUCT#{}", created.id), METADATA_SK)
            .unwrap();
        assert_eq!(meta.gsi3.unwrap().sort, "RATING#003.00");

        let after_delete = repo.delete_review(&created.id, &review_id).await.unwrap();
        assert_eq!(after_delete.review_count, 1);
        assert!((after_delete.rating - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn search_matches_folded_text() {
        let repo = products();
        repo.create(Product::new("Cà Phê Sữa Đá", 45_000, 2, "drinks"))
            .await
            .unwrap();
        repo.create(Product::new("Trà Sen", 30_000, 2, "drinks"))
            .await
            .unwrap();
        let hits = repo.search("sua da").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Cà Phê Sữa Đá");
    }

    #[tokio::test]
    async fn delete_removes_children_too() {
        let repo = products();
        let created = repo
            .create(Product::new("Ghế Gỗ", 500_000, 1, "furniture"))
            .await
            .unwrap();
        repo.add_review(&created.id, Review::new("u1", 3, ""))
            .await
            .unwrap();
        repo.delete(&created.id).await.unwrap();
        assert!(repo.table.is_empty());
        assert!(repo.find_by_id(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn order_code_and_user_lookups_use_projections() {
        let table = Arc::new(WideColumnTable::new());
        let repo: WideColumnAdapter<Order> =
            WideColumnAdapter::new(Arc::clone(&table), MapperConfig::default());
        let order = Order::new(
            "u-9",
            "SF-2024-000042",
            vec![OrderItem {
                product_id: "p-1".into(),
                name: "Cà Phê".into(),
                price: 45_000,
                quantity: 1,
            }],
        );
        let created = repo.create(order).await.unwrap();

        let by_code = repo.find_by_code("SF-2024-000042").await.unwrap();
        assert_eq!(by_code.id, created.id);
        assert_eq!(by_code.items.len(), 1);

        let by_user = repo.find_by_user("u-9").await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert!(repo.find_by_code("SF-0000").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let table = Arc::new(WideColumnTable::new());
        let repo: WideColumnAdapter<User> =
            WideColumnAdapter::new(table, MapperConfig::default());
        repo.create(User::new("An.Nguyen@Example.com", "An Nguyễn"))
            .await
            .unwrap();
        let user = repo.find_by_email("an.nguyen@example.com").await.unwrap();
        assert_eq!(user.name, "An Nguyễn");
    }
}
