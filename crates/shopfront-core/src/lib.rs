//! Shopfront domain model and repository contract.
//!
//! Every domain service in the storefront talks to its backing store through
//! the traits in [`repository`]; the concrete adapter behind a trait object is
//! chosen elsewhere (by the migration router) and is deliberately invisible to
//! callers. This crate therefore holds everything both stores must agree on:
//!
//! - the entity types and their patch/filter companions ([`entity`])
//! - the shared error vocabulary ([`error`])
//! - pagination over already-filtered in-memory sets ([`page`])
//! - diacritic folding used by keyword search in both adapters ([`text`])
//!
//! No I/O happens here.

pub mod entity;
pub mod error;
pub mod page;
pub mod repository;
pub mod text;

pub use entity::{
    Category, CategoryFilter, CategoryPatch, Entity, EntityFilter, EntityKind, Order, OrderFilter,
    OrderItem, OrderPatch, OrderStatus, Product, ProductFilter, ProductPatch, Review, User,
    UserFilter, UserPatch,
};
pub use error::{Result, StoreError};
pub use page::{paginate, Page, PageRequest};
pub use repository::{
    assign_id, new_id, CategoryRepository, OrderRepository, ProductRepository, Repository,
    UserRepository,
};
