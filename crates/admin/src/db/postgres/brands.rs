//! Brand queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use shopdesk_core::BrandId;

use super::{Columns, PgStore, count, map_write_error, push_order_and_page, push_search, slug};
use crate::db::{BrandStore, RepositoryError};
use crate::models::{Brand, BrandData, ListQuery, Page, SelectOption};

const COLUMNS: Columns = &[
    ("name", "name"),
    ("slug", "slug"),
    ("url", "url"),
    ("primary_hex", "primary_hex"),
    ("is_visible", "is_visible"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

const SELECT: &str = r"
    SELECT id, name, slug, url, description, is_visible, primary_hex, created_at, updated_at
    FROM brands
";

#[derive(Debug, sqlx::FromRow)]
struct BrandRow {
    id: BrandId,
    name: String,
    slug: String,
    url: String,
    description: Option<String>,
    is_visible: bool,
    primary_hex: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BrandRow> for Brand {
    type Error = RepositoryError;

    fn try_from(row: BrandRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: slug(&row.slug)?,
            url: row.url,
            description: row.description,
            is_visible: row.is_visible,
            primary_hex: row.primary_hex,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BrandStore for PgStore {
    async fn list_brands(&self, query: &ListQuery) -> Result<Page<Brand>, RepositoryError> {
        let mut counter = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM brands WHERE TRUE");
        push_search(&mut counter, query, COLUMNS);
        let total: i64 = counter.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT);
        select.push(" WHERE TRUE");
        push_search(&mut select, query, COLUMNS);
        push_order_and_page(&mut select, query, COLUMNS, "id");
        let rows: Vec<BrandRow> = select.build_query_as().fetch_all(self.pool()).await?;

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

    async fn get_brand(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(&format!("{SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn insert_brand(&self, data: &BrandData) -> Result<Brand, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(
            r"
            INSERT INTO brands (name, slug, url, description, is_visible, primary_hex)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, slug, url, description, is_visible, primary_hex,
                      created_at, updated_at
            ",
        )
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.url)
        .bind(&data.description)
        .bind(data.is_visible)
        .bind(&data.primary_hex)
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;

        row.try_into()
    }

    async fn update_brand(&self, id: BrandId, data: &BrandData) -> Result<Brand, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(
            r"
            UPDATE brands
            SET name = $2, slug = $3, url = $4, description = $5, is_visible = $6,
                primary_hex = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, url, description, is_visible, primary_hex,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.url)
        .bind(&data.description)
        .bind(data.is_visible)
        .bind(&data.primary_hex)
        .fetch_optional(self.pool())
        .await
        .map_err(map_write_error)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_brands(&self, ids: &[BrandId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(BrandId::as_i64).collect();
        let mut tx = self.pool().begin().await?;

        let owner: Option<i64> = sqlx::query_scalar(
            "SELECT brand_id FROM products WHERE brand_id = ANY($1) LIMIT 1",
        )
        .bind(&ids)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(owner) = owner {
            return Err(RepositoryError::Conflict(format!(
                "brand {owner} still owns products"
            )));
        }

        let result = sqlx::query("DELETE FROM brands WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn brand_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        let options = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM brands ORDER BY name")
            .fetch_all(self.pool())
            .await?;
        Ok(options
            .into_iter()
            .map(|(id, name)| SelectOption { id, name })
            .collect())
    }

    async fn brand_url_taken(
        &self,
        url: &str,
        except: Option<BrandId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM brands WHERE url = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(url)
        .bind(except)
        .fetch_one(self.pool())
        .await?;
        Ok(taken)
    }
}
