//! Order aggregate: the order row and its line items.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{CustomerId, OrderId, OrderItemId, OrderStatus, Price, ProductId};

use super::{CellValue, Record};

/// An order with its items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Name of the customer, loaded alongside the row.
    pub customer_name: Option<String>,
    /// `OR-` followed by a random number.
    pub number: String,
    pub total_price: Price,
    pub status: OrderStatus,
    pub shipping_price: Option<Price>,
    /// Markdown notes; empty when none were given.
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Line items. Empty in list results.
    pub items: Vec<OrderItem>,
}

/// A line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: i32,
    /// Product price when the line was added or its product last changed.
    pub unit_price: Price,
}

impl OrderItem {
    /// `quantity × unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price
            .times(u32::try_from(self.quantity).unwrap_or_default())
    }
}

impl Order {
    /// Whether the order is soft-deleted.
    #[must_use]
    pub const fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Order fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderInput {
    pub customer_id: Option<CustomerId>,
    pub status: Option<OrderStatus>,
    pub shipping_price: Option<Decimal>,
    pub notes: Option<String>,
    /// On update, `None` keeps the current items; `Some` replaces them:
    /// entries with an `id` update that item, entries without one are added,
    /// and items not listed are removed.
    pub items: Option<Vec<OrderItemInput>>,
}

/// Line item fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItemInput {
    pub id: Option<OrderItemId>,
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

/// A line item in a draft; `id` is `None` for lines not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub id: Option<OrderItemId>,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Price,
}

impl LineItem {
    /// `quantity × unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price
            .times(u32::try_from(self.quantity).unwrap_or_default())
    }
}

/// The full order aggregate as it is about to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub number: String,
    pub status: OrderStatus,
    pub shipping_price: Option<Price>,
    pub notes: String,
    pub items: Vec<LineItem>,
}

impl OrderDraft {
    /// Load an existing order into a draft.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            customer_id: order.customer_id,
            number: order.number.clone(),
            status: order.status,
            shipping_price: order.shipping_price,
            notes: order.notes.clone(),
            items: order
                .items
                .iter()
                .map(|item| LineItem {
                    id: Some(item.id),
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }

    /// `Σ(quantity × unit_price) + shipping`; missing shipping counts as zero.
    #[must_use]
    pub fn total_price(&self) -> Price {
        let items: Price = self.items.iter().map(LineItem::line_total).sum();
        items + self.shipping_price.unwrap_or_default()
    }
}

/// Soft-delete visibility for order lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trashed {
    /// Hide soft-deleted orders.
    #[default]
    Without,
    /// Include soft-deleted orders.
    With,
    /// Only soft-deleted orders.
    Only,
}

impl Trashed {
    /// Whether an order with the given `deleted_at` is listed.
    #[must_use]
    pub const fn includes(self, deleted_at: Option<&DateTime<Utc>>) -> bool {
        match self {
            Self::Without => deleted_at.is_none(),
            Self::With => true,
            Self::Only => deleted_at.is_some(),
        }
    }
}

impl FromStr for Trashed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "without" | "" => Ok(Self::Without),
            "with" => Ok(Self::With),
            "only" => Ok(Self::Only),
            _ => Err(format!("invalid trashed filter: {s}")),
        }
    }
}

/// Table filters for the order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub trashed: Trashed,
}

impl OrderFilter {
    /// Whether `order` passes the filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.trashed.includes(order.deleted_at.as_ref())
    }
}

impl Record for Order {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn title(&self) -> String {
        self.number.clone()
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Int(self.id.as_i64()),
            "number" => self.number.as_str().into(),
            "customer.name" => self.customer_name.clone().into(),
            "status" => self.status.as_str().into(),
            "total_price" => self.total_price.into(),
            "shipping_price" => self.shipping_price.into(),
            "notes" => self.notes.as_str().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            "deleted_at" => self.deleted_at.into(),
            _ => CellValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(product: i64, quantity: i32, cents: u32) -> LineItem {
        LineItem {
            id: None,
            product_id: ProductId::new(product),
            quantity,
            unit_price: Price::from_cents(cents),
        }
    }

    fn draft(items: Vec<LineItem>, shipping: Option<Price>) -> OrderDraft {
        OrderDraft {
            customer_id: CustomerId::new(1),
            number: "OR-100000".to_string(),
            status: OrderStatus::Pending,
            shipping_price: shipping,
            notes: String::new(),
            items,
        }
    }

    #[test]
    fn test_total_includes_items_and_shipping() {
        let order = draft(
            vec![line(1, 2, 1000), line(2, 1, 500)],
            Some(Price::from_cents(300)),
        );
        assert_eq!(order.total_price().to_string(), "28.00");
    }

    #[test]
    fn test_missing_shipping_counts_as_zero() {
        let order = draft(vec![line(1, 3, 250)], None);
        assert_eq!(order.total_price().to_string(), "7.50");
    }

    #[test]
    fn test_empty_order_totals_shipping_only() {
        let order = draft(vec![], Some(Price::from_cents(990)));
        assert_eq!(order.total_price(), Price::from_cents(990));
    }

    #[test]
    fn test_trashed_filter() {
        let now = Utc::now();
        assert!(Trashed::Without.includes(None));
        assert!(!Trashed::Without.includes(Some(&now)));
        assert!(Trashed::With.includes(Some(&now)));
        assert!(!Trashed::Only.includes(None));
        assert_eq!("only".parse::<Trashed>(), Ok(Trashed::Only));
        assert!("all".parse::<Trashed>().is_err());
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_of_lines_plus_shipping(
            lines in proptest::collection::vec((1i32..50, 0u32..50_000), 0..10),
            shipping in proptest::option::of(0u32..10_000),
        ) {
            let items: Vec<LineItem> = lines
                .iter()
                .enumerate()
                .map(|(i, &(q, c))| line(i64::try_from(i).unwrap_or_default(), q, c))
                .collect();
            let order = draft(items, shipping.map(Price::from_cents));

            let expected_cents: i64 = lines
                .iter()
                .map(|&(q, c)| i64::from(q) * i64::from(c))
                .sum::<i64>()
                + i64::from(shipping.unwrap_or(0));
            prop_assert_eq!(order.total_price().amount(), Decimal::new(expected_cents, 2));
        }
    }
}
