//! Order management.
//!
//! Orders are written as a whole aggregate: every change loads the order into
//! an [`OrderDraft`], edits it, recomputes the total and saves it in one
//! store call. Line items snapshot the product price when they are added or
//! pointed at a different product; later catalog price changes do not touch
//! existing orders.

use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use shopdesk_core::{CustomerId, FieldErrors, OrderId, OrderItemId, Price, ProductId};

use super::{ServiceError, invalid_selection, present};
use crate::db::Store;
use crate::models::{
    LineItem, ListQuery, Order, OrderDraft, OrderFilter, OrderInput, OrderItem, OrderItemInput,
    Page,
};
use crate::resources::Resource;
use crate::resources::orders::item_form;

/// Attempts at drawing an unused order number.
const NUMBER_ATTEMPTS: usize = 10;

/// A page of orders with the total over every matching order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    #[serde(flatten)]
    pub page: Page<Order>,
    /// Sum of `total_price` across all pages.
    pub total_price_sum: Price,
}

/// Order operations over a store.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// List orders with the summed total.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<OrderList, ServiceError> {
        let page = self.store.list_orders(query, filter).await?;
        let total_price_sum = self.store.sum_order_totals(query, filter).await?;
        Ok(OrderList {
            page,
            total_price_sum,
        })
    }

    /// Get an order with its items, trashed orders included.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.store
            .get_order(id, true)
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }

    /// An order that may still be edited (not trashed).
    async fn live(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.store
            .get_order(id, false)
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }

    /// Create an order with a generated number.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid input, an unknown
    /// customer or product, or a total above the order maximum.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &OrderInput) -> Result<Order, ServiceError> {
        let mut errors = Resource::Orders
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();
        self.check_customer(input.customer_id, &mut errors).await?;
        let items = self
            .lines(&[], input.items.as_deref().unwrap_or_default(), &mut errors)
            .await?;
        let shipping_price = shipping(input, &mut errors);
        errors.into_result()?;

        let draft = OrderDraft {
            customer_id: present(input.customer_id, "customer_id")?,
            number: self.next_number().await?,
            status: input.status.unwrap_or_default(),
            shipping_price,
            notes: input.notes.clone().unwrap_or_default(),
            items,
        };
        check_total(&draft)?;

        let order = self.store.insert_order(&draft).await?;
        info!(
            order_id = %order.id,
            number = %order.number,
            items = order.items.len(),
            total = %order.total_price,
            "Order created"
        );
        Ok(order)
    }

    /// Update an order's fields and, when `input.items` is given, its items.
    ///
    /// The number never changes. An absent status keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown or trashed orders, or
    /// `ServiceError::Validation`.
    #[instrument(skip(self, input), fields(order_id = %id))]
    pub async fn update(&self, id: OrderId, input: &OrderInput) -> Result<Order, ServiceError> {
        let order = self.live(id).await?;
        let mut errors = Resource::Orders
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();
        self.check_customer(input.customer_id, &mut errors).await?;
        let items = match &input.items {
            Some(items) => Some(self.lines(&order.items, items, &mut errors).await?),
            None => None,
        };
        let shipping_price = shipping(input, &mut errors);
        errors.into_result()?;

        let mut draft = OrderDraft::from_order(&order);
        draft.customer_id = present(input.customer_id, "customer_id")?;
        draft.status = input.status.unwrap_or(order.status);
        draft.shipping_price = shipping_price;
        draft.notes = input.notes.clone().unwrap_or_default();
        if let Some(items) = items {
            draft.items = items;
        }
        self.save(id, &draft).await
    }

    /// Add a line to an order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`.
    #[instrument(skip(self, input), fields(order_id = %id))]
    pub async fn add_item(&self, id: OrderId, input: &OrderItemInput) -> Result<Order, ServiceError> {
        let order = self.live(id).await?;
        let mut errors = item_form().validate_input(input).err().unwrap_or_default();
        let line = self.line(input, None, &mut errors).await?;
        errors.into_result()?;

        let mut draft = OrderDraft::from_order(&order);
        draft.items.extend(line);
        self.save(id, &draft).await
    }

    /// Change a line's product or quantity.
    ///
    /// An absent quantity keeps the current one. Pointing the line at a
    /// different product takes that product's current price.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order or item does not exist.
    #[instrument(skip(self, input), fields(order_id = %id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        id: OrderId,
        item_id: OrderItemId,
        input: &OrderItemInput,
    ) -> Result<Order, ServiceError> {
        let order = self.live(id).await?;
        let stored = order
            .items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or(ServiceError::NotFound("order item"))?;
        let mut errors = item_form().validate_input(input).err().unwrap_or_default();
        let line = self.line(input, Some(stored), &mut errors).await?;
        errors.into_result()?;

        let mut draft = OrderDraft::from_order(&order);
        if let Some(line) = line
            && let Some(slot) = draft.items.iter_mut().find(|l| l.id == Some(item_id))
        {
            *slot = line;
        }
        self.save(id, &draft).await
    }

    /// Remove a line from an order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order or item does not exist.
    #[instrument(skip(self), fields(order_id = %id, item_id = %item_id))]
    pub async fn remove_item(&self, id: OrderId, item_id: OrderItemId) -> Result<Order, ServiceError> {
        let order = self.live(id).await?;
        let mut draft = OrderDraft::from_order(&order);
        let before = draft.items.len();
        draft.items.retain(|l| l.id != Some(item_id));
        if draft.items.len() == before {
            return Err(ServiceError::NotFound("order item"));
        }
        self.save(id, &draft).await
    }

    /// Soft-delete an order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown or already trashed orders.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), ServiceError> {
        self.live(id).await?;
        self.store.soft_delete_orders(&[id]).await?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Soft-delete several orders. Unknown or trashed IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[instrument(skip(self))]
    pub async fn bulk_delete(&self, ids: &[OrderId]) -> Result<u64, ServiceError> {
        let deleted = self.store.soft_delete_orders(ids).await?;
        info!(deleted, "Orders bulk deleted");
        Ok(deleted)
    }

    /// Bring a soft-deleted order back. Restoring a live order is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn restore(&self, id: OrderId) -> Result<Order, ServiceError> {
        let order = self.get(id).await?;
        if !order.is_trashed() {
            return Ok(order);
        }
        if !self.store.restore_order(id).await? {
            return Err(ServiceError::NotFound("order"));
        }
        info!(order_id = %id, number = %order.number, "Order restored");
        self.get(id).await
    }

    /// Delete an order and its items permanently.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn force_delete(&self, id: OrderId) -> Result<(), ServiceError> {
        if !self.store.force_delete_order(id).await? {
            return Err(ServiceError::NotFound("order"));
        }
        info!(order_id = %id, "Order force deleted");
        Ok(())
    }

    async fn save(&self, id: OrderId, draft: &OrderDraft) -> Result<Order, ServiceError> {
        check_total(draft)?;
        let order = self.store.save_order(id, draft).await?;
        info!(
            number = %order.number,
            items = order.items.len(),
            total = %order.total_price,
            "Order saved"
        );
        Ok(order)
    }

    async fn check_customer(
        &self,
        customer_id: Option<CustomerId>,
        errors: &mut FieldErrors,
    ) -> Result<(), ServiceError> {
        if let Some(customer_id) = customer_id
            && self.store.get_customer(customer_id).await?.is_none()
        {
            errors.add("customer_id", invalid_selection("customer_id"));
        }
        Ok(())
    }

    /// Current prices of the given products; unknown IDs are absent.
    async fn prices(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Price>, ServiceError> {
        let ids: Vec<ProductId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.price))
            .collect())
    }

    /// Turn submitted item rows into draft lines, matching rows with an id
    /// against the order's stored items.
    async fn lines(
        &self,
        stored: &[OrderItem],
        inputs: &[OrderItemInput],
        errors: &mut FieldErrors,
    ) -> Result<Vec<LineItem>, ServiceError> {
        let prices = self.prices(inputs.iter().filter_map(|i| i.product_id)).await?;
        let mut lines = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let mut row_errors = FieldErrors::new();
            let existing = match input.id {
                Some(item_id) => {
                    let found = stored.iter().find(|i| i.id == item_id);
                    if found.is_none() {
                        row_errors.add("id", invalid_selection("id"));
                    }
                    found
                }
                None => None,
            };
            if let Some(line) = build_line(input, existing, &prices, &mut row_errors) {
                lines.push(line);
            }
            errors.merge_nested(&format!("items.{index}"), row_errors);
        }
        Ok(lines)
    }

    async fn line(
        &self,
        input: &OrderItemInput,
        stored: Option<&OrderItem>,
        errors: &mut FieldErrors,
    ) -> Result<Option<LineItem>, ServiceError> {
        let prices = self.prices(input.product_id).await?;
        Ok(build_line(input, stored, &prices, errors))
    }

    async fn next_number(&self) -> Result<String, ServiceError> {
        for _ in 0..NUMBER_ATTEMPTS {
            let number = generate_number();
            if !self.store.order_number_taken(&number).await? {
                return Ok(number);
            }
            warn!(number = %number, "Order number collision, drawing again");
        }
        Err(ServiceError::Conflict(
            "could not find an unused order number".to_string(),
        ))
    }
}

/// A fresh order number, `OR-` followed by six or seven digits.
fn generate_number() -> String {
    format!("OR-{}", rand::rng().random_range(100_000..=9_999_999))
}

/// Resolve one item row; messages use the row's own field names.
fn build_line(
    input: &OrderItemInput,
    stored: Option<&OrderItem>,
    prices: &HashMap<ProductId, Price>,
    errors: &mut FieldErrors,
) -> Option<LineItem> {
    let product_id = input.product_id?;
    let Some(current_price) = prices.get(&product_id).copied() else {
        errors.add("product_id", invalid_selection("product_id"));
        return None;
    };
    let quantity = match input.quantity {
        Some(q) => i32::try_from(q).ok()?,
        None => stored.map_or(1, |s| s.quantity),
    };
    let unit_price = match stored {
        Some(s) if s.product_id == product_id => s.unit_price,
        _ => current_price,
    };
    Some(LineItem {
        id: stored.map(|s| s.id),
        product_id,
        quantity,
        unit_price,
    })
}

fn shipping(input: &OrderInput, errors: &mut FieldErrors) -> Option<Price> {
    let amount = input.shipping_price?;
    if errors.has("shipping_price") {
        return None;
    }
    match Price::new(amount) {
        Ok(price) => Some(price),
        Err(e) => {
            errors.add(
                "shipping_price",
                format!("The shipping price field is invalid: {e}."),
            );
            None
        }
    }
}

fn check_total(draft: &OrderDraft) -> Result<(), ServiceError> {
    draft
        .total_price()
        .ensure_at_most(Price::MAX_ORDER)
        .map_err(|_| {
            ServiceError::Validation(FieldErrors::single(
                "total_price",
                format!("The total price must not be greater than {}.", Price::MAX_ORDER),
            ))
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{CustomerInput, ProductInput, Trashed};
    use crate::services::{CatalogService, CustomerService};
    use rust_decimal::Decimal;
    use shopdesk_core::{OrderStatus, ProductType};

    struct Fixture {
        store: MemoryStore,
        customer: CustomerId,
        shoe: ProductId,
        sock: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let customer = CustomerService::new(&store)
            .create(&CustomerInput {
                name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
                phone: None,
            })
            .await
            .unwrap()
            .id;
        let catalog = CatalogService::new(&store);
        let mut ids = Vec::new();
        for (name, sku, cents) in [("Shoe", "SH-1", 1000), ("Sock", "SO-1", 250)] {
            let product = catalog
                .create_product(&ProductInput {
                    name: Some(name.to_string()),
                    sku: Some(sku.to_string()),
                    price: Some(Decimal::new(cents, 2)),
                    quantity: Some(10),
                    product_type: Some(ProductType::Deliverable),
                    ..ProductInput::default()
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        Fixture {
            store,
            customer,
            shoe: ids[0],
            sock: ids[1],
        }
    }

    fn item(product: ProductId, quantity: i64) -> OrderItemInput {
        OrderItemInput {
            id: None,
            product_id: Some(product),
            quantity: Some(quantity),
        }
    }

    #[tokio::test]
    async fn test_create_computes_total_and_number() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let order = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                shipping_price: Some(Decimal::new(300, 2)),
                items: Some(vec![item(f.shoe, 2), item(f.sock, 2)]),
                ..OrderInput::default()
            })
            .await
            .unwrap();

        // 2 × 10.00 + 2 × 2.50 + 3.00
        assert_eq!(order.total_price.to_string(), "28.00");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.number.starts_with("OR-"));
        assert_eq!(order.items.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_references_are_validation_errors() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let err = service
            .create(&OrderInput {
                customer_id: Some(CustomerId::new(999)),
                items: Some(vec![item(f.shoe, 1), item(ProductId::new(999), 1)]),
                ..OrderInput::default()
            })
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("customer_id"), ["The selected customer id is invalid."]);
        assert_eq!(
            errors.get("items.1.product_id"),
            ["The selected product id is invalid."]
        );
    }

    #[tokio::test]
    async fn test_unit_price_is_snapshotted() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let order = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                items: Some(vec![item(f.shoe, 1)]),
                ..OrderInput::default()
            })
            .await
            .unwrap();

        let catalog = CatalogService::new(&f.store);
        let shoe = catalog.get_product(f.shoe).await.unwrap();
        catalog
            .update_product(
                f.shoe,
                &ProductInput {
                    name: Some(shoe.name),
                    sku: Some(shoe.sku),
                    price: Some(Decimal::new(5000, 2)),
                    quantity: Some(10),
                    product_type: Some(ProductType::Deliverable),
                    ..ProductInput::default()
                },
            )
            .await
            .unwrap();

        let item_id = order.items[0].id;
        let updated = service
            .update_item(
                order.id,
                item_id,
                &OrderItemInput {
                    id: None,
                    product_id: Some(f.shoe),
                    quantity: Some(3),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.items[0].unit_price.to_string(), "10.00");
        assert_eq!(updated.total_price.to_string(), "30.00");

        let switched = service
            .update_item(order.id, item_id, &item(f.sock, 3))
            .await
            .unwrap();
        assert_eq!(switched.items[0].unit_price.to_string(), "2.50");
    }

    #[tokio::test]
    async fn test_add_and_remove_items_recompute_total() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let order = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                ..OrderInput::default()
            })
            .await
            .unwrap();
        assert_eq!(order.total_price, Price::zero());

        let order = service.add_item(order.id, &item(f.sock, 4)).await.unwrap();
        assert_eq!(order.total_price.to_string(), "10.00");

        let item_id = order.items[0].id;
        let order = service.remove_item(order.id, item_id).await.unwrap();
        assert!(order.items.is_empty());
        assert_eq!(order.total_price, Price::zero());

        let err = service.remove_item(order.id, item_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("order item")));
    }

    #[tokio::test]
    async fn test_update_keeps_items_when_absent_and_rejects_foreign_ids() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let order = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                items: Some(vec![item(f.shoe, 1)]),
                ..OrderInput::default()
            })
            .await
            .unwrap();

        let updated = service
            .update(
                order.id,
                &OrderInput {
                    customer_id: Some(f.customer),
                    status: Some(OrderStatus::Completed),
                    ..OrderInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.number, order.number);

        let err = service
            .update(
                order.id,
                &OrderInput {
                    customer_id: Some(f.customer),
                    items: Some(vec![OrderItemInput {
                        id: Some(OrderItemId::new(999)),
                        product_id: Some(f.shoe),
                        quantity: Some(1),
                    }]),
                    ..OrderInput::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(e) if e.has("items.0.id")));
    }

    #[tokio::test]
    async fn test_total_above_maximum_is_rejected() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let err = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                shipping_price: Some(Price::MAX_ORDER),
                items: Some(vec![item(f.sock, 1)]),
                ..OrderInput::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(e) if e.has("total_price")));
    }

    #[tokio::test]
    async fn test_soft_delete_restore_and_force_delete() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let order = service
            .create(&OrderInput {
                customer_id: Some(f.customer),
                ..OrderInput::default()
            })
            .await
            .unwrap();

        service.delete(order.id).await.unwrap();
        assert!(service.get(order.id).await.unwrap().is_trashed());
        let listed = service
            .list(&ListQuery::default(), &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.page.total, 0);
        let only = OrderFilter {
            trashed: Trashed::Only,
            ..OrderFilter::default()
        };
        assert_eq!(
            service.list(&ListQuery::default(), &only).await.unwrap().page.total,
            1
        );
        assert!(matches!(
            service.add_item(order.id, &item(f.shoe, 1)).await,
            Err(ServiceError::NotFound("order"))
        ));

        let restored = service.restore(order.id).await.unwrap();
        assert!(!restored.is_trashed());

        service.force_delete(order.id).await.unwrap();
        assert!(matches!(
            service.get(order.id).await,
            Err(ServiceError::NotFound("order"))
        ));
    }

    #[test]
    fn test_generated_numbers_are_prefixed() {
        for _ in 0..100 {
            let number = generate_number();
            let digits = number.strip_prefix("OR-").unwrap();
            assert!((6..=7).contains(&digits.len()));
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
