//! Schema mapper: domain entities ⇄ wide-column items.
//!
//! Pure translation, no I/O. Each entity produces one metadata item plus one
//! child item per owned sub-record (reviews, order line items). Derived
//! fields — index projections, the diacritic-folded name copy, the price
//! bucket — exist only on the item side and are recomputed on every write;
//! they never round-trip back into the entity.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use shopfront_core::entity::{
    Category, Entity, EntityKind, Order, OrderFilter, OrderItem, Product, ProductFilter, Review,
    User,
};
use shopfront_core::error::{Result, StoreError};
use shopfront_core::text::fold_diacritics;

use crate::item::{IndexKey, IndexName, Item, METADATA_SK};

// ============================================================================
// Config
// ============================================================================

/// Mapper configuration. The asset base keeps stored records portable across
/// environments: only the relative path is persisted, the absolute URL is
/// reconstructed on read.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub asset_base_url: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            asset_base_url: "https://assets.shopfront.dev".to_string(),
        }
    }
}

// ============================================================================
// Derived values
// ============================================================================

/// Price bucket used as the price-range index partition. Boundaries are
/// half-open and monotonic; the last bucket is unbounded above. Negative
/// price is invalid input.
pub fn price_bucket(price: i64) -> Result<&'static str> {
    if price < 0 {
        return Err(StoreError::validation(format!(
            "price bucket requires price >= 0, got {price}"
        )));
    }
    Ok(match price {
        0..=99_999 => "0-100000",
        100_000..=199_999 => "100000-200000",
        200_000..=299_999 => "200000-300000",
        300_000..=499_999 => "300000-500000",
        _ => "500000+",
    })
}

/// Fixed-width rating rendering so lexicographic index order equals numeric
/// order (`004.50` < `005.00`).
fn rating_sort_key(rating: f64) -> String {
    format!("RATING#{:06.2}", rating.clamp(0.0, 5.0))
}

pub fn partition_key(kind: EntityKind, id: &str) -> String {
    format!("{}#{id}", kind.type_tag())
}

/// Strip the configured asset base (or any host prefix) down to the stored
/// relative path.
pub fn relative_asset_path(url: &str, cfg: &MapperConfig) -> String {
    let base = cfg.asset_base_url.trim_end_matches('/');
    let path = if let Some(rest) = url.strip_prefix(base) {
        rest
    } else if let Some(scheme_end) = url.find("://") {
        let after_scheme = &url[scheme_end + 3..];
        after_scheme
            .find('/')
            .map_or("", |slash| &after_scheme[slash..])
    } else {
        url
    };
    path.trim_start_matches('/').to_string()
}

/// Reconstruct the absolute URL for a stored relative path.
pub fn absolute_asset_url(path: &str, cfg: &MapperConfig) -> String {
    format!(
        "{}/{}",
        cfg.asset_base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ============================================================================
// Mapper trait
// ============================================================================

/// Entity ⇄ item translation implemented by every entity kind stored in the
/// single table.
pub trait WideColumnEntity: Entity {
    /// The metadata item first, children after. Deterministic.
    fn to_items(&self, cfg: &MapperConfig) -> Result<Vec<Item>>;

    /// Rebuild the entity from a partition's metadata item and children.
    fn from_items(meta: &Item, children: &[Item], cfg: &MapperConfig) -> Result<Self>;

    /// Which secondary index (if any) can serve `filter`. `None` sends
    /// `find_all` down the full-scan fallback.
    fn index_hint(_filter: &Self::Filter) -> Option<(IndexName, String)> {
        None
    }
}

fn to_attributes<T: Serialize>(value: &T, kind: EntityKind) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::validation(format!(
            "{kind} did not serialize to an object"
        ))),
        Err(err) => Err(StoreError::validation(format!(
            "unserializable {kind}: {err}"
        ))),
    }
}

fn from_attributes<T: DeserializeOwned>(attrs: Map<String, Value>, what: &str) -> Result<T> {
    serde_json::from_value(Value::Object(attrs))
        .map_err(|err| StoreError::validation(format!("malformed {what} item: {err}")))
}

fn sort_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

// ============================================================================
// Product
// ============================================================================

impl WideColumnEntity for Product {
    fn to_items(&self, cfg: &MapperConfig) -> Result<Vec<Item>> {
        let pk = partition_key(EntityKind::Product, &self.id);
        let mut attrs = to_attributes(self, EntityKind::Product)?;
        attrs.remove("reviews");
        attrs.insert(
            "name_normalized".into(),
            Value::String(fold_diacritics(&self.name)),
        );
        if let Some(image) = &self.image {
            attrs.insert(
                "image".into(),
                Value::String(relative_asset_path(image, cfg)),
            );
        }

        let mut meta = Item::new(pk.clone(), METADATA_SK, EntityKind::Product.type_tag(), attrs);
        meta.gsi1 = Some(IndexKey::new(
            format!("CATEGORY#{}", self.category_id),
            self.name.to_lowercase(),
        ));
        meta.gsi3 = Some(IndexKey::new(
            format!("PRICE#{}", price_bucket(self.price)?),
            rating_sort_key(self.rating),
        ));

        let mut items = vec![meta];
        for review in &self.reviews {
            items.push(Item::new(
                pk.clone(),
                format!("REVIEW#{}", review.id),
                "REVIEW",
                to_attributes(review, EntityKind::Product)?,
            ));
        }
        Ok(items)
    }

    fn from_items(meta: &Item, children: &[Item], cfg: &MapperConfig) -> Result<Self> {
        let mut attrs = meta.attributes.clone();
        attrs.remove("name_normalized");
        if let Some(Value::String(path)) = attrs.get("image").cloned() {
            attrs.insert("image".into(), Value::String(absolute_asset_url(&path, cfg)));
        }

        let mut reviews: Vec<Review> = children
            .iter()
            .filter(|child| child.sk.starts_with("REVIEW#"))
            .map(|child| from_attributes(child.attributes.clone(), "review"))
            .collect::<Result<_>>()?;
        reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        attrs.insert(
            "reviews".into(),
            serde_json::to_value(&reviews)
                .map_err(|err| StoreError::validation(format!("unserializable reviews: {err}")))?,
        );
        from_attributes(attrs, "product")
    }

    fn index_hint(filter: &ProductFilter) -> Option<(IndexName, String)> {
        filter
            .category_id
            .as_ref()
            .map(|category_id| (IndexName::Gsi1, format!("CATEGORY#{category_id}")))
    }
}

// ============================================================================
// Order
// ============================================================================

impl WideColumnEntity for Order {
    fn to_items(&self, _cfg: &MapperConfig) -> Result<Vec<Item>> {
        let pk = partition_key(EntityKind::Order, &self.id);
        let mut attrs = to_attributes(self, EntityKind::Order)?;
        attrs.remove("items");

        let mut meta = Item::new(pk.clone(), METADATA_SK, EntityKind::Order.type_tag(), attrs);
        meta.gsi1 = Some(IndexKey::new(
            format!("USER#{}", self.user_id),
            sort_stamp(self.created_at),
        ));
        meta.gsi2 = Some(IndexKey::new(
            format!("STATUS#{}", self.status),
            sort_stamp(self.created_at),
        ));
        // Late-added business-code lookup; the projection name is fixed like
        // the others even though it arrived after the first cutover plan.
        meta.gsi3 = Some(IndexKey::new(
            format!("CODE#{}", self.order_code),
            METADATA_SK.to_string(),
        ));

        let mut items = vec![meta];
        for (index, line) in self.items.iter().enumerate() {
            items.push(Item::new(
                pk.clone(),
                format!("ITEM#{index:04}"),
                "ORDER_ITEM",
                to_attributes(line, EntityKind::Order)?,
            ));
        }
        Ok(items)
    }

    fn from_items(meta: &Item, children: &[Item], _cfg: &MapperConfig) -> Result<Self> {
        let mut attrs = meta.attributes.clone();
        let mut line_items: Vec<(String, OrderItem)> = children
            .iter()
            .filter(|child| child.sk.starts_with("ITEM#"))
            .map(|child| {
                from_attributes(child.attributes.clone(), "order item")
                    .map(|line| (child.sk.clone(), line))
            })
            .collect::<Result<_>>()?;
        line_items.sort_by(|a, b| a.0.cmp(&b.0));
        let lines: Vec<OrderItem> = line_items.into_iter().map(|(_, line)| line).collect();
        attrs.insert(
            "items".into(),
            serde_json::to_value(&lines)
                .map_err(|err| StoreError::validation(format!("unserializable items: {err}")))?,
        );
        from_attributes(attrs, "order")
    }

    fn index_hint(filter: &OrderFilter) -> Option<(IndexName, String)> {
        if let Some(user_id) = &filter.user_id {
            return Some((IndexName::Gsi1, format!("USER#{user_id}")));
        }
        filter
            .status
            .map(|status| (IndexName::Gsi2, format!("STATUS#{status}")))
    }
}

// ============================================================================
// User / Category
// ============================================================================

impl WideColumnEntity for User {
    fn to_items(&self, _cfg: &MapperConfig) -> Result<Vec<Item>> {
        let pk = partition_key(EntityKind::User, &self.id);
        let attrs = to_attributes(self, EntityKind::User)?;
        let mut meta = Item::new(pk, METADATA_SK, EntityKind::User.type_tag(), attrs);
        meta.gsi1 = Some(IndexKey::new(
            format!("EMAIL#{}", self.email.to_lowercase()),
            METADATA_SK.to_string(),
        ));
        Ok(vec![meta])
    }

    fn from_items(meta: &Item, _children: &[Item], _cfg: &MapperConfig) -> Result<Self> {
        from_attributes(meta.attributes.clone(), "user")
    }
}

impl WideColumnEntity for Category {
    fn to_items(&self, _cfg: &MapperConfig) -> Result<Vec<Item>> {
        let pk = partition_key(EntityKind::Category, &self.id);
        let attrs = to_attributes(self, EntityKind::Category)?;
        let mut meta = Item::new(pk, METADATA_SK, EntityKind::Category.type_tag(), attrs);
        meta.gsi1 = Some(IndexKey::new(
            format!("SLUG#{}", self.slug),
            METADATA_SK.to_string(),
        ));
        Ok(vec![meta])
    }

    fn from_items(meta: &Item, _children: &[Item], _cfg: &MapperConfig) -> Result<Self> {
        from_attributes(meta.attributes.clone(), "category")
    }
}

// ============================================================================
// Tests
// ============================================================================
