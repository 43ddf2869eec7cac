//! Dual-write coordinator.
//!
//! A decorator implementing the same repository traits as a bare adapter, so
//! callers cannot tell the difference. Dispatch is a fixed allow-list:
//!
//! - reads (`find_by_id`, `find_all`, `count`, `search`, the category /
//!   user / email / code lookups) go to the primary only — the secondary is
//!   never consulted;
//! - writes (`create`, `update`, `delete`, `update_stock`, `add_review`,
//!   `delete_review`) are awaited against the primary, then the identical
//!   call is queued against the secondary. On primary failure the secondary
//!   is not attempted and the error propagates unchanged.
//!
//! The result is an eventual-consistency window: a reader of the primary
//! sees the write immediately, the secondary catches up whenever its queued
//! job runs, and nobody acknowledges when that happened.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shopfront_core::entity::{Category, Entity, Order, Product, Review, User};
use shopfront_core::error::Result;
use shopfront_core::page::{Page, PageRequest};
use shopfront_core::repository::{
    new_id, CategoryRepository, OrderRepository, ProductRepository, Repository, UserRepository,
};

use crate::replication::ReplicationHandle;

pub struct DualWrite<R: ?Sized> {
    primary: Arc<R>,
    secondary: Arc<R>,
    replication: ReplicationHandle,
}

impl<R: ?Sized> DualWrite<R> {
    pub fn new(primary: Arc<R>, secondary: Arc<R>, replication: ReplicationHandle) -> Self {
        Self {
            primary,
            secondary,
            replication,
        }
    }
}

/// Base contract: reads to primary, writes to primary then queued to
/// secondary. One expansion per entity kind keeps the allow-list explicit.
macro_rules! impl_dual_write_base {
    ($entity:ty, $repo:ident) => {
        #[async_trait]
        impl Repository<$entity> for DualWrite<dyn $repo> {
            async fn find_by_id(&self, id: &str) -> Result<$entity> {
                self.primary.find_by_id(id).await
            }

            async fn find_all(
                &self,
                filter: &<$entity as Entity>::Filter,
                page: PageRequest,
            ) -> Result<Page<$entity>> {
                self.primary.find_all(filter, page).await
            }

            async fn create(&self, entity: $entity) -> Result<$entity> {
                let created = self.primary.create(entity).await?;
                let secondary = Arc::clone(&self.secondary);
                let replica = created.clone();
                let args = json!({
                    "kind": <$entity as Entity>::KIND.type_tag(),
                    "id": created.id(),
                });
                self.replication.submit("create", args, async move {
                    secondary.create(replica).await.map(|_| ())
                });
                Ok(created)
            }

            async fn update(
                &self,
                id: &str,
                patch: <$entity as Entity>::Patch,
            ) -> Result<$entity> {
                let args = json!({
                    "kind": <$entity as Entity>::KIND.type_tag(),
                    "id": id,
                    "patch": serde_json::to_value(&patch).unwrap_or(serde_json::Value::Null),
                });
                let updated = self.primary.update(id, patch.clone()).await?;
                let secondary = Arc::clone(&self.secondary);
                let id = id.to_string();
                self.replication.submit("update", args, async move {
                    secondary.update(&id, patch).await.map(|_| ())
                });
                Ok(updated)
            }

            async fn delete(&self, id: &str) -> Result<()> {
                self.primary.delete(id).await?;
                let secondary = Arc::clone(&self.secondary);
                let args = json!({
                    "kind": <$entity as Entity>::KIND.type_tag(),
                    "id": id,
                });
                let id = id.to_string();
                self.replication
                    .submit("delete", args, async move { secondary.delete(&id).await });
                Ok(())
            }

            async fn count(&self) -> Result<usize> {
                self.primary.count().await
            }
        }
    };
}

impl_dual_write_base!(Product, ProductRepository);
impl_dual_write_base!(Order, OrderRepository);
impl_dual_write_base!(User, UserRepository);
impl_dual_write_base!(Category, CategoryRepository);

#[async_trait]
impl ProductRepository for DualWrite<dyn ProductRepository> {
    async fn update_stock(&self, id: &str, delta: i64) -> Result<Product> {
        let updated = self.primary.update_stock(id, delta).await?;
        let secondary = Arc::clone(&self.secondary);
        let args = json!({ "id": id, "delta": delta });
        let id = id.to_string();
        self.replication.submit("update_stock", args, async move {
            secondary.update_stock(&id, delta).await.map(|_| ())
        });
        Ok(updated)
    }

    async fn add_review(&self, product_id: &str, mut review: Review) -> Result<Product> {
        // Assign the review id before the primary write so both stores end
        // up with the same one.
        if review.id.is_empty() {
            review.id = new_id();
        }
        let updated = self.primary.add_review(product_id, review.clone()).await?;
        let secondary = Arc::clone(&self.secondary);
        let args = json!({ "product_id": product_id, "review_id": review.id });
        let product_id = product_id.to_string();
        self.replication.submit("add_review", args, async move {
            secondary.add_review(&product_id, review).await.map(|_| ())
        });
        Ok(updated)
    }

    async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<Product> {
        let updated = self.primary.delete_review(product_id, review_id).await?;
        let secondary = Arc::clone(&self.secondary);
        let args = json!({ "product_id": product_id, "review_id": review_id });
        let product_id = product_id.to_string();
        let review_id = review_id.to_string();
        self.replication.submit("delete_review", args, async move {
            secondary
                .delete_review(&product_id, &review_id)
                .await
                .map(|_| ())
        });
        Ok(updated)
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.primary.find_by_category(category_id, page).await
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Product>> {
        self.primary.search(keyword).await
    }
}

#[async_trait]
impl OrderRepository for DualWrite<dyn OrderRepository> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        self.primary.find_by_user(user_id).await
    }

    async fn find_by_code(&self, order_code: &str) -> Result<Order> {
        self.primary.find_by_code(order_code).await
    }
}

#[async_trait]
impl UserRepository for DualWrite<dyn UserRepository> {
    async fn find_by_email(&self, email: &str) -> Result<User> {
        self.primary.find_by_email(email).await
    }
}

#[async_trait]
impl CategoryRepository for DualWrite<dyn CategoryRepository> {
    async fn find_by_slug(&self, slug: &str) -> Result<Category> {
        self.primary.find_by_slug(slug).await
    }
}
