//! Order entity with owned line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityFilter, EntityKind};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item owned by an order. Child record in the wide-column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    /// Denormalized at order time; a later product rename must not rewrite
    /// order history.
    pub name: String,
    pub price: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    /// Human-facing business code (`SF-2024-000123` style); served by the
    /// late-added code lookup.
    pub order_code: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_id: impl Into<String>,
        order_code: impl Into<String>,
        items: Vec<OrderItem>,
    ) -> Self {
        let now = Utc::now();
        let total = items
            .iter()
            .map(|item| item.price * i64::from(item.quantity))
            .sum();
        Self {
            id: String::new(),
            user_id: user_id.into(),
            order_code: order_code.into(),
            status: OrderStatus::Pending,
            items,
            total,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Index-eligible on the wide-column side.
    pub user_id: Option<String>,
    /// Index-eligible on the wide-column side.
    pub status: Option<OrderStatus>,
}

impl EntityFilter<Order> for OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        if let Some(user_id) = &self.user_id {
            if &order.user_id != user_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        true
    }
}

impl Entity for Order {
    type Patch = OrderPatch;
    type Filter = OrderFilter;

    const KIND: EntityKind = EntityKind::Order;

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
        if self.user_id.is_empty() {
            return Err(StoreError::validation("order user_id must not be empty"));
        }
        if self.order_code.is_empty() {
            return Err(StoreError::validation("order code must not be empty"));
        }
        if self.items.is_empty() {
            return Err(StoreError::validation("order must contain at least one item"));
        }
        if self.total < 0 {
            return Err(StoreError::validation(format!(
                "order total must be non-negative, got {}",
                self.total
            )));
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(StoreError::validation(format!(
                    "order item {} must have quantity > 0",
                    item.product_id
                )));
            }
            if item.price < 0 {
                return Err(StoreError::validation(format!(
                    "order item {} must have a non-negative price",
                    item.product_id
                )));
            }
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: &OrderPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            name: product_id.into(),
            price,
            quantity,
        }
    }

    #[test]
    fn total_is_derived_from_items() {
        let order = Order::new("u1", "SF-0001", vec![item("p1", 50_000, 2), item("p2", 10_000, 1)]);
        assert_eq!(order.total, 110_000);
    }

    #[test]
    fn empty_orders_are_rejected() {
        let order = Order::new("u1", "SF-0002", Vec::new());
        assert!(order.validate().is_err());
    }

    #[test]
    fn patch_moves_status_only() {
        let mut order = Order::new("u1", "SF-0003", vec![item("p1", 1_000, 1)]);
        order.apply_patch(&OrderPatch {
            status: Some(OrderStatus::Shipped),
        });
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.order_code, "SF-0003");
    }
}
