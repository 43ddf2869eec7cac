//! Product entity, its owned reviews, and the product patch/filter types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityFilter, EntityKind};
use crate::error::{Result, StoreError};

/// A customer review owned by a product. Stored as a child record in the
/// wide-column layout and as a nested array in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    /// 1..=5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// The id starts empty and is assigned when the review is attached
    /// through `add_review`.
    pub fn new(user_id: impl Into<String>, rating: u8, comment: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        // An empty id is only a pre-persistence state; stored with it, every
        // review would share one child record key and clobber the others.
        if self.id.is_empty() {
            return Err(StoreError::validation(
                "review id must be assigned before persisting",
            ));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(StoreError::validation(format!(
                "review rating must be 1..=5, got {}",
                self.rating
            )));
        }
        if self.user_id.is_empty() {
            return Err(StoreError::validation("review user_id must not be empty"));
        }
        Ok(())
    }
}

/// Arithmetic mean over `reviews`, `0.0` when none remain.
pub(crate) fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(sum) / reviews.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub stock: i64,
    pub category_id: String,
    /// Business code; kept as a plain attribute, not an index.
    #[serde(default)]
    pub sku: String,
    /// Absolute URL in the domain view; the wide-column layout stores only
    /// the relative path.
    #[serde(default)]
    pub image: Option<String>,
    /// Derived: mean of `reviews`, maintained on every review mutation.
    #[serde(default)]
    pub rating: f64,
    /// Derived: `reviews.len()`, persisted alongside the mean.
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: i64,
        stock: i64,
        category_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            price,
            stock,
            category_id: category_id.into(),
            sku: String::new(),
            image: None,
            rating: 0.0,
            review_count: 0,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the persisted review aggregates from the owned reviews.
    pub fn recompute_review_aggregates(&mut self) {
        self.rating = mean_rating(&self.reviews);
        self.review_count = self.reviews.len() as u32;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub category_id: Option<String>,
    pub sku: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Index-eligible on the wide-column side; everything else is evaluated
    /// in memory after retrieval.
    pub category_id: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
}

impl EntityFilter<Product> for ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = &self.category_id {
            if &product.category_id != category_id {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        if let Some(in_stock) = self.in_stock {
            if (product.stock > 0) != in_stock {
                return false;
            }
        }
        true
    }
}

impl Entity for Product {
    type Patch = ProductPatch;
    type Filter = ProductFilter;

    const KIND: EntityKind = EntityKind::Product;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("product name must not be empty"));
        }
        if self.price < 0 {
            return Err(StoreError::validation(format!(
                "product price must be non-negative, got {}",
                self.price
            )));
        }
        if self.stock < 0 {
            return Err(StoreError::validation(format!(
                "product stock must be non-negative, got {}",
                self.stock
            )));
        }
        if self.category_id.is_empty() {
            return Err(StoreError::validation("product category_id must not be empty"));
        }
        for review in &self.reviews {
            review.validate()?;
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category_id) = &patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(sku) = &patch.sku {
            self.sku = sku.clone();
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_price_is_rejected() {
        let product = Product::new("Áo Thun", -1, 5, "cat-1");
        let err = product.validate().unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn unassigned_review_ids_are_rejected() {
        let mut product = Product::new("Ấm Trà", 95_000, 4, "cat-1");
        product.reviews.push(Review::new("u1", 4, ""));
        let err = product.validate().unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        product.reviews[0].id = "r-1".into();
        assert!(product.validate().is_ok());
    }

    #[test]
    fn mean_rating_is_zero_without_reviews() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn aggregates_follow_reviews() {
        let mut product = Product::new("Nón Lá", 50_000, 3, "cat-1");
        product.reviews.push(Review::new("u1", 5, "tốt"));
        product.reviews.push(Review::new("u2", 2, ""));
        product.recompute_review_aggregates();
        assert_eq!(product.review_count, 2);
        assert!((product.rating - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn filter_checks_price_range_and_category() {
        let product = Product::new("Bàn Gỗ", 250_000, 1, "cat-7");
        let mut filter = ProductFilter {
            category_id: Some("cat-7".into()),
            min_price: Some(200_000),
            max_price: Some(300_000),
            ..Default::default()
        };
        assert!(filter.matches(&product));
        filter.max_price = Some(200_000);
        assert!(!filter.matches(&product));
    }
}
