//! Order aggregate queries.
//!
//! The order row and its items are always written together in one
//! transaction, with `total_price` taken from the draft being saved.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder, Transaction};

use shopdesk_core::{CustomerId, OrderId, OrderItemId, OrderStatus, Price, ProductId};

use super::{Columns, PgStore, count, map_write_error, price, push_order_and_page, push_search};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{
    ListQuery, Order, OrderDraft, OrderFilter, OrderItem, Page, Trashed,
};

const COLUMNS: Columns = &[
    ("number", "o.number"),
    ("customer.name", "c.name"),
    ("status", "o.status"),
    ("total_price", "o.total_price"),
    ("shipping_price", "o.shipping_price"),
    ("notes", "o.notes"),
    ("created_at", "o.created_at"),
    ("updated_at", "o.updated_at"),
    ("deleted_at", "o.deleted_at"),
];

const FROM: &str = " FROM orders o LEFT JOIN customers c ON c.id = o.customer_id WHERE TRUE";

const SELECT: &str = r"
    SELECT o.id, o.customer_id, c.name AS customer_name, o.number, o.total_price, o.status,
           o.shipping_price, o.notes, o.created_at, o.updated_at, o.deleted_at
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    customer_name: Option<String>,
    number: String,
    total_price: Decimal,
    status: OrderStatus,
    shipping_price: Option<Decimal>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            number: row.number,
            total_price: price(row.total_price, "total_price")?,
            status: row.status,
            shipping_price: row
                .shipping_price
                .map(|amount| price(amount, "shipping_price"))
                .transpose()?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            items: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: Option<String>,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: price(row.unit_price, "unit_price")?,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND o.status = ");
        qb.push_bind(status);
    }
    match filter.trashed {
        Trashed::Without => {
            qb.push(" AND o.deleted_at IS NULL");
        }
        Trashed::Only => {
            qb.push(" AND o.deleted_at IS NOT NULL");
        }
        Trashed::With => {}
    }
}

/// Insert or update every line of `draft` and delete stored items it no
/// longer lists.
async fn sync_items(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    draft: &OrderDraft,
) -> Result<(), RepositoryError> {
    let stored: HashSet<OrderItemId> =
        sqlx::query_scalar::<_, OrderItemId>("SELECT id FROM order_items WHERE order_id = $1")
            .bind(id)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .collect();

    let kept: Vec<i64> = draft
        .items
        .iter()
        .filter_map(|line| line.id)
        .map(|item_id| item_id.as_i64())
        .collect();
    if let Some(foreign) = kept
        .iter()
        .find(|item_id| !stored.contains(&OrderItemId::new(**item_id)))
    {
        return Err(RepositoryError::Conflict(format!(
            "item {foreign} does not belong to order {id}"
        )));
    }

    sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
        .bind(id)
        .bind(&kept)
        .execute(&mut **tx)
        .await?;

    for line in &draft.items {
        match line.id {
            Some(item_id) => {
                sqlx::query(
                    r"
                    UPDATE order_items
                    SET product_id = $3, quantity = $4, unit_price = $5, updated_at = NOW()
                    WHERE id = $1 AND order_id = $2
                    ",
                )
                .bind(item_id)
                .bind(id)
                .bind(line.product_id)
                .bind(line.quantity)
                .bind(line.unit_price.amount())
                .execute(&mut **tx)
                .await
                .map_err(map_write_error)?;
            }
            None => {
                sqlx::query(
                    r"
                    INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                    VALUES ($1, $2, $3, $4)
                    ",
                )
                .bind(id)
                .bind(line.product_id)
                .bind(line.quantity)
                .bind(line.unit_price.amount())
                .execute(&mut **tx)
                .await
                .map_err(map_write_error)?;
            }
        }
    }
    Ok(())
}

impl PgStore {
    async fn fetch_order(
        &self,
        id: OrderId,
        include_trashed: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT}{FROM} AND o.id = $1 AND ($2 OR o.deleted_at IS NULL)"
        ))
        .bind(id)
        .bind(include_trashed)
        .fetch_optional(self.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = Order::try_from(row)?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, p.name AS product_name, i.quantity,
                   i.unit_price
            FROM order_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        order.items = items
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;

        Ok(Some(order))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn list_orders(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Page<Order>, RepositoryError> {
        let mut counter = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        counter.push(FROM);
        push_filter(&mut counter, filter);
        push_search(&mut counter, query, COLUMNS);
        let total: i64 = counter.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT);
        select.push(FROM);
        push_filter(&mut select, filter);
        push_search(&mut select, query, COLUMNS);
        push_order_and_page(&mut select, query, COLUMNS, "o.id");
        let rows: Vec<OrderRow> = select.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            total: count(total),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn sum_order_totals(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Price, RepositoryError> {
        let mut sum = QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(o.total_price), 0)");
        sum.push(FROM);
        push_filter(&mut sum, filter);
        push_search(&mut sum, query, COLUMNS);
        let total: Decimal = sum.build_query_scalar().fetch_one(self.pool()).await?;
        price(total.round_dp(2), "sum(total_price)")
    }

    async fn get_order(
        &self,
        id: OrderId,
        include_trashed: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        self.fetch_order(id, include_trashed).await
    }

    async fn order_number_taken(&self, number: &str) -> Result<bool, RepositoryError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE number = $1)")
                .bind(number)
                .fetch_one(self.pool())
                .await?;
        Ok(taken)
    }

    async fn insert_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO orders (customer_id, number, total_price, status, shipping_price, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(draft.customer_id)
        .bind(&draft.number)
        .bind(draft.total_price().amount())
        .bind(draft.status)
        .bind(draft.shipping_price.map(|p| p.amount()))
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        sync_items(&mut tx, id, draft).await?;
        tx.commit().await?;

        self.fetch_order(id, true)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_order(&self, id: OrderId, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r"
            UPDATE orders
            SET customer_id = $2, number = $3, total_price = $4, status = $5,
                shipping_price = $6, notes = $7, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(draft.customer_id)
        .bind(&draft.number)
        .bind(draft.total_price().amount())
        .bind(draft.status)
        .bind(draft.shipping_price.map(|p| p.amount()))
        .bind(&draft.notes)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sync_items(&mut tx, id, draft).await?;
        tx.commit().await?;

        self.fetch_order(id, true)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn soft_delete_orders(&self, ids: &[OrderId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(OrderId::as_i64).collect();
        let result = sqlx::query(
            "UPDATE orders SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&ids)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn restore_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET deleted_at = NULL WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn force_delete_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
