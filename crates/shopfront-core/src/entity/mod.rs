//! Domain entities and their patch/filter companions.
//!
//! An entity keeps one logical shape regardless of which physical store backs
//! it; the same external id resolves to the same record in both stores once
//! replicated. Everything here is plain serde data — translation into the
//! wide-column layout lives in the wide-column crate.

mod category;
mod order;
mod product;
mod user;

pub use category::{Category, CategoryFilter, CategoryPatch};
pub use order::{Order, OrderFilter, OrderItem, OrderPatch, OrderStatus};
pub use product::{Product, ProductFilter, ProductPatch, Review};
pub use user::{User, UserFilter, UserPatch};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Entity kinds
// ============================================================================

/// Discriminator carried by every stored record so store-wide scans can be
/// filtered by logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Product,
    Order,
    User,
    Category,
}

impl EntityKind {
    pub const ALL: [Self; 4] = [Self::Product, Self::Order, Self::User, Self::Category];

    /// Uppercase tag used as the `entity_type` discriminator and as the
    /// partition-key prefix in the wide-column layout.
    pub fn type_tag(self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::Order => "ORDER",
            Self::User => "USER",
            Self::Category => "CATEGORY",
        }
    }

    /// Collection name in the document store.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Order => "orders",
            Self::User => "users",
            Self::Category => "categories",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

// ============================================================================
// Entity and filter traits
// ============================================================================

/// A filter evaluated in memory against an already-fetched result set.
pub trait EntityFilter<E>: Clone + Default + Send + Sync + 'static {
    fn matches(&self, entity: &E) -> bool;
}

/// Common surface both store adapters need from a domain entity.
pub trait Entity:
    Clone + Send + Sync + Serialize + DeserializeOwned + std::fmt::Debug + 'static
{
    type Patch: Clone + Send + Sync + 'static;
    type Filter: EntityFilter<Self>;

    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn created_at(&self) -> DateTime<Utc>;

    /// Reject malformed input before it reaches either store.
    fn validate(&self) -> Result<()>;

    /// Apply a partial update and refresh `updated_at`.
    fn apply_patch(&mut self, patch: &Self::Patch);
}
