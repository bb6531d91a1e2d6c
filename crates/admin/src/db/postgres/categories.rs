//! Category queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use shopdesk_core::CategoryId;

use super::{Columns, PgStore, count, map_write_error, push_order_and_page, push_search, slug};
use crate::db::{CategoryStore, RepositoryError};
use crate::models::{Category, CategoryData, ListQuery, Page, SelectOption};

const COLUMNS: Columns = &[
    ("name", "c.name"),
    ("slug", "c.slug"),
    ("parent.name", "p.name"),
    ("is_visible", "c.is_visible"),
    ("created_at", "c.created_at"),
    ("updated_at", "c.updated_at"),
];

const SELECT: &str = r"
    SELECT c.id, c.name, c.slug, c.description, c.is_visible, c.parent_id,
           p.name AS parent_name, c.created_at, c.updated_at
    FROM categories c
    LEFT JOIN categories p ON p.id = c.parent_id
";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: Option<String>,
    is_visible: bool,
    parent_id: Option<CategoryId>,
    parent_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: slug(&row.slug)?,
            description: row.description,
            is_visible: row.is_visible,
            parent_id: row.parent_id,
            parent_name: row.parent_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<CategoryRow>) -> Result<Vec<Category>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

impl PgStore {
    async fn fetch_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!("{SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self, query: &ListQuery) -> Result<Page<Category>, RepositoryError> {
        let mut counter = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM categories c LEFT JOIN categories p ON p.id = c.parent_id WHERE TRUE",
        );
        push_search(&mut counter, query, COLUMNS);
        let total: i64 = counter.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT);
        select.push(" WHERE TRUE");
        push_search(&mut select, query, COLUMNS);
        push_order_and_page(&mut select, query, COLUMNS, "c.id");
        let rows: Vec<CategoryRow> = select.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: collect(rows)?,
            total: count(total),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn all_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!("{SELECT} ORDER BY c.id"))
            .fetch_all(self.pool())
            .await?;
        collect(rows)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        self.fetch_category(id).await
    }

    async fn insert_category(&self, data: &CategoryData) -> Result<Category, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, slug, description, is_visible, parent_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.description)
        .bind(data.is_visible)
        .bind(data.parent_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;

        self.fetch_category(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        data: &CategoryData,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, is_visible = $5, parent_id = $6,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.description)
        .bind(data.is_visible)
        .bind(data.parent_id)
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.fetch_category(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(CategoryId::as_i64).collect();
        // Children are detached by ON DELETE SET NULL, pivot rows by CASCADE.
        let result = sqlx::query("DELETE FROM categories WHERE id = ANY($1)")
            .bind(&ids)
            .execute(self.pool())
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }

    async fn category_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        let options =
            sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(options
            .into_iter()
            .map(|(id, name)| SelectOption { id, name })
            .collect())
    }

    async fn existing_categories(
        &self,
        ids: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(CategoryId::as_i64).collect();
        let found: Vec<CategoryId> =
            sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1) ORDER BY id")
                .bind(&ids)
                .fetch_all(self.pool())
                .await?;
        Ok(found)
    }
}
