//! Document-store adapter implementing the repository contract.
//!
//! Documents are the entities themselves: one collection per kind, relations
//! nested inside the owning document. The document store has no secondary
//! indexes, so every lookup beyond `find_by_id` is a collection scan with
//! in-memory filtering — acceptable for the store being migrated away from.

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
use shopfront_core::text::contains_keyword;

// ============================================================================
// Adapter
// ============================================================================

#[derive(Debug)]
pub struct DocumentAdapter<E: Entity> {
    db: Arc<super::DocumentDb>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> DocumentAdapter<E> {
    pub fn new(db: Arc<super::DocumentDb>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    fn collection() -> &'static str {
        E::KIND.collection()
    }

    fn scan_decoded(&self) -> Result<Vec<E>> {
        self.db
            .scan(Self::collection())
            .into_iter()
            .map(decode::<E>)
            .collect()
    }
}

impl<E: Entity> Clone for DocumentAdapter<E> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.db))
    }
}

fn decode<E: Entity>(doc: Value) -> Result<E> {
    serde_json::from_value(doc)
        .map_err(|err| StoreError::validation(format!("malformed {} document: {err}", E::KIND)))
}

fn encode<E: Entity>(entity: &E) -> Result<Value> {
    serde_json::to_value(entity)
        .map_err(|err| StoreError::validation(format!("unserializable {}: {err}", E::KIND)))
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
impl<E: Entity> Repository<E> for DocumentAdapter<E> {
    async fn find_by_id(&self, id: &str) -> Result<E> {
        let doc = self
            .db
            .get(Self::collection(), id)
            .ok_or_else(|| StoreError::not_found(E::KIND.type_tag(), id))?;
        decode(doc)
    }

    async fn find_all(&self, filter: &E::Filter, page: PageRequest) -> Result<Page<E>> {
        let mut entities = self.scan_decoded()?;
        entities.retain(|entity| filter.matches(entity));
        sort_newest_first(&mut entities);
        Ok(paginate(entities, page))
    }

    async fn create(&self, mut entity: E) -> Result<E> {
        assign_id(&mut entity);
        entity.validate()?;
        let doc = encode(&entity)?;
        if !self.db.insert(Self::collection(), entity.id(), doc) {
            return Err(StoreError::validation(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            )));
        }
        Ok(entity)
    }

    async fn update(&self, id: &str, patch: E::Patch) -> Result<E> {
        self.db
            .modify(Self::collection(), id, |doc| {
                let mut entity: E = decode(doc.clone())?;
                entity.apply_patch(&patch);
                entity.validate()?;
                *doc = encode(&entity)?;
                Ok(entity)
            })?
            .ok_or_else(|| StoreError::not_found(E::KIND.type_tag(), id))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if !self.db.remove(Self::collection(), id) {
            return Err(StoreError::not_found(E::KIND.type_tag(), id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.db.count(Self::collection()))
    }
}

// ============================================================================
// Entity-specific operations
// ============================================================================

#[async_trait]
impl ProductRepository for DocumentAdapter<Product> {
    async fn update_stock(&self, id: &str, delta: i64) -> Result<Product> {
        self.db
            .modify(Self::collection(), id, |doc| {
                let mut product: Product = decode(doc.clone())?;
                let available = product.stock;
                let new_stock = available + delta;
                if new_stock < 0 {
                    return Err(StoreError::InsufficientStock {
                        id: id.to_string(),
                        available,
                        delta,
                    });
                }
                product.stock = new_stock;
                product.updated_at = Utc::now();
                *doc = encode(&product)?;
                Ok(product)
            })?
            .ok_or_else(|| StoreError::not_found("PRODUCT", id))
    }

    async fn add_review(&self, product_id: &str, mut review: Review) -> Result<Product> {
        if review.id.is_empty() {
            review.id = new_id();
        }
        review.validate()?;
        self.db
            .modify(Self::collection(), product_id, |doc| {
                let mut product: Product = decode(doc.clone())?;
                product.reviews.push(review.clone());
                product.recompute_review_aggregates();
                product.updated_at = Utc::now();
                *doc = encode(&product)?;
                Ok(product)
            })?
            .ok_or_else(|| StoreError::not_found("PRODUCT", product_id))
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<Product> {
        self.db
            .modify(Self::collection(), product_id, |doc| {
                let mut product: Product = decode(doc.clone())?;
                let before = product.reviews.len();
                product.reviews.retain(|review| review.id != review_id);
                if product.reviews.len() == before {
                    return Err(StoreError::not_found("REVIEW", review_id));
                }
                product.recompute_review_aggregates();
                product.updated_at = Utc::now();
                *doc = encode(&product)?;
                Ok(product)
            })?
            .ok_or_else(|| StoreError::not_found("PRODUCT", product_id))
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let mut products = self.scan_decoded()?;
        products.retain(|product| product.category_id == category_id);
        // Name order, matching the category index sort on the wide-column side.
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(products, page))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Product>> {
        let mut products = self.scan_decoded()?;
        products.retain(|product| {
            contains_keyword(&product.name, keyword)
                || contains_keyword(&product.description, keyword)
        });
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[async_trait]
impl OrderRepository for DocumentAdapter<Order> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let mut orders = self.scan_decoded()?;
        orders.retain(|order| order.user_id == user_id);
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Order> {
        self.scan_decoded()?
            .into_iter()
            .find(|order| order.order_code == order_code)
            .ok_or_else(|| StoreError::not_found("ORDER", order_code))
    }
}

#[async_trait]
impl UserRepository for DocumentAdapter<User> {
    async fn find_by_email(&self, email: &str) -> Result<User> {
        let needle = email.to_lowercase();
        self.scan_decoded()?
            .into_iter()
            .find(|user| user.email.to_lowercase() == needle)
            .ok_or_else(|| StoreError::not_found("USER", email))
    }
}

#[async_trait]
impl CategoryRepository for DocumentAdapter<Category> {
    async fn find_by_slug(&self, slug: &str) -> Result<Category> {
        self.scan_decoded()?
            .into_iter()
            .find(|category| category.slug == slug)
            .ok_or_else(|| StoreError::not_found("CATEGORY", slug))
    }
}

// ============================================================================
// Tests
// ============================================================================
