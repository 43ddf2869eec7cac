//! Wide-column side of the storefront.
//!
//! All four entity kinds share one physical table of pk/sk-keyed items:
//!
//! ```text
//! ┌──────────────────┬───────────────┬─────────────────────────────────────┐
//! │ pk               │ sk            │                                     │
//! ├──────────────────┼───────────────┼─────────────────────────────────────┤
//! │ PRODUCT#<id>     │ METADATA      │ product attrs + gsi1/gsi3           │
//! │ PRODUCT#<id>     │ REVIEW#<id>   │ one review child item               │
//! │ ORDER#<id>       │ METADATA      │ order attrs + gsi1/gsi2/gsi3        │
//! │ ORDER#<id>       │ ITEM#<n>      │ one line-item child item            │
//! │ USER#<id>        │ METADATA      │ user attrs + gsi1                   │
//! │ CATEGORY#<id>    │ METADATA      │ category attrs + gsi1               │
//! └──────────────────┴───────────────┴─────────────────────────────────────┘
//! ```
//!
//! [`mapper`] translates entities to and from this layout (pure, no I/O),
//! [`table`] is the in-process engine, and [`adapter`] implements the
//! repository contract on top of both. Secondary-index projection names are
//! fixed per query pattern and identical regardless of which store is
//! currently primary.

pub mod adapter;
pub mod item;
pub mod mapper;
pub mod table;

pub use adapter::WideColumnAdapter;
pub use item::{IndexKey, IndexName, Item, METADATA_SK};
pub use mapper::{price_bucket, MapperConfig, WideColumnEntity};
pub use table::WideColumnTable;
