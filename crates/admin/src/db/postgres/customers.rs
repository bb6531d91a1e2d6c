//! Customer queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};

use shopdesk_core::CustomerId;

use super::{Columns, PgStore, count, map_write_error, push_order_and_page, push_search};
use crate::db::{CustomerStore, RepositoryError};
use crate::models::{Customer, CustomerData, ListQuery, Page, SelectOption};

const COLUMNS: Columns = &[
    ("name", "name"),
    ("email", "email"),
    ("phone", "phone"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

const SELECT: &str = "SELECT id, name, email, phone, created_at, updated_at FROM customers";

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: CustomerId,
    name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>, RepositoryError> {
        let mut counter =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_search(&mut counter, query, COLUMNS);
        let total: i64 = counter.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT);
        select.push(" WHERE TRUE");
        push_search(&mut select, query, COLUMNS);
        push_order_and_page(&mut select, query, COLUMNS, "id");
        let rows: Vec<CustomerRow> = select.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: rows.into_iter().map(Customer::from).collect(),
            total: count(total),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!("{SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Customer::from))
    }

    async fn insert_customer(&self, data: &CustomerData) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO customers (name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, phone, created_at, updated_at
            ",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        data: &CustomerData,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            UPDATE customers
            SET name = $2, email = $3, phone = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .fetch_optional(self.pool())
        .await
        .map_err(map_write_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_customers(&self, ids: &[CustomerId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(CustomerId::as_i64).collect();
        // Orders and their items go with the customer (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM customers WHERE id = ANY($1)")
            .bind(&ids)
            .execute(self.pool())
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }

    async fn customer_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        let options =
            sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM customers ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(options
            .into_iter()
            .map(|(id, name)| SelectOption { id, name })
            .collect())
    }

    async fn email_taken(
        &self,
        email: &str,
        except: Option<CustomerId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE LOWER(email) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(self.pool())
        .await?;
        Ok(taken)
    }
}
