//! Product queries, category links included.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder, Transaction};

use shopdesk_core::{BrandId, CategoryId, ProductId, ProductType};

use super::{
    Columns, PgStore, count, escape_like, map_write_error, price, push_order_and_page,
    push_search, slug,
};
use crate::db::{ProductStore, RepositoryError};
use crate::models::{ListQuery, Page, Product, ProductData, ProductFilter, SelectOption};

const COLUMNS: Columns = &[
    ("name", "p.name"),
    ("slug", "p.slug"),
    ("sku", "p.sku"),
    ("description", "p.description"),
    ("brand.name", "b.name"),
    ("is_visible", "p.is_visible"),
    ("is_featured", "p.is_featured"),
    ("quantity", "p.quantity"),
    ("price", "p.price"),
    ("type", "p.type"),
    ("published_at", "p.published_at"),
    ("created_at", "p.created_at"),
    ("updated_at", "p.updated_at"),
];

const SELECT: &str = r"
    SELECT p.id, p.brand_id, b.name AS brand_name, p.name, p.slug, p.sku, p.image,
           p.description, p.quantity, p.price, p.is_visible, p.is_featured,
           p.type AS product_type, p.published_at,
           COALESCE(ARRAY(
               SELECT cp.category_id FROM category_product cp
               WHERE cp.product_id = p.id ORDER BY cp.category_id
           ), '{}') AS category_ids,
           p.created_at, p.updated_at
    FROM products p
    LEFT JOIN brands b ON b.id = p.brand_id
";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    brand_id: Option<BrandId>,
    brand_name: Option<String>,
    name: String,
    slug: String,
    sku: String,
    image: Option<String>,
    description: Option<String>,
    quantity: i32,
    price: Decimal,
    is_visible: bool,
    is_featured: bool,
    product_type: ProductType,
    published_at: NaiveDate,
    category_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            brand_id: row.brand_id,
            brand_name: row.brand_name,
            name: row.name,
            slug: slug(&row.slug)?,
            sku: row.sku,
            image: row.image,
            description: row.description,
            quantity: row.quantity,
            price: price(row.price, "price")?,
            is_visible: row.is_visible,
            is_featured: row.is_featured,
            product_type: row.product_type,
            published_at: row.published_at,
            category_ids: row.category_ids.into_iter().map(CategoryId::new).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(visible) = filter.is_visible {
        qb.push(" AND p.is_visible = ");
        qb.push_bind(visible);
    }
    if let Some(brand) = filter.brand_id {
        qb.push(" AND p.brand_id = ");
        qb.push_bind(brand.as_i64());
    }
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM category_product WHERE product_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    let ids: Vec<i64> = category_ids.iter().map(CategoryId::as_i64).collect();
    sqlx::query(
        r"
        INSERT INTO category_product (category_id, product_id)
        SELECT DISTINCT c, $1 FROM UNNEST($2::BIGINT[]) AS c
        ",
    )
    .bind(id)
    .bind(&ids)
    .execute(&mut **tx)
    .await
    .map_err(map_write_error)?;
    Ok(())
}

impl PgStore {
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(
        &self,
        query: &ListQuery,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut counter = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM products p LEFT JOIN brands b ON b.id = p.brand_id WHERE TRUE",
        );
        push_filter(&mut counter, filter);
        push_search(&mut counter, query, COLUMNS);
        let total: i64 = counter.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT);
        select.push(" WHERE TRUE");
        push_filter(&mut select, filter);
        push_search(&mut select, query, COLUMNS);
        push_order_and_page(&mut select, query, COLUMNS, "p.id");
        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: collect(rows)?,
            total: count(total),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.fetch_product(id).await
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT} WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;
        collect(rows)
    }

    async fn insert_product(&self, data: &ProductData) -> Result<Product, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products (brand_id, name, slug, sku, image, description, quantity,
                                  price, is_visible, is_featured, type, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(data.brand_id)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.sku)
        .bind(&data.image)
        .bind(&data.description)
        .bind(data.quantity)
        .bind(data.price.amount())
        .bind(data.is_visible)
        .bind(data.is_featured)
        .bind(data.product_type)
        .bind(data.published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        link_categories(&mut tx, id, &data.category_ids).await?;
        tx.commit().await?;

        self.fetch_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn update_product(
        &self,
        id: ProductId,
        data: &ProductData,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r"
            UPDATE products
            SET brand_id = $2, name = $3, slug = $4, sku = $5, image = $6, description = $7,
                quantity = $8, price = $9, is_visible = $10, is_featured = $11, type = $12,
                published_at = $13, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(data.brand_id)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.sku)
        .bind(&data.image)
        .bind(&data.description)
        .bind(data.quantity)
        .bind(data.price.amount())
        .bind(data.is_visible)
        .bind(data.is_featured)
        .bind(data.product_type)
        .bind(data.published_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        link_categories(&mut tx, id, &data.category_ids).await?;
        tx.commit().await?;

        self.fetch_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_products(&self, ids: &[ProductId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let mut tx = self.pool().begin().await?;

        let ordered: Option<i64> = sqlx::query_scalar(
            "SELECT product_id FROM order_items WHERE product_id = ANY($1) LIMIT 1",
        )
        .bind(&ids)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(product) = ordered {
            return Err(RepositoryError::Conflict(format!(
                "product {product} appears on an order"
            )));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn search_products(
        &self,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(needle.trim()));
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"{SELECT}
            WHERE p.name ILIKE $1 OR p.slug ILIKE $1 OR COALESCE(p.description, '') ILIKE $1
            ORDER BY p.name, p.id
            LIMIT $2"
        ))
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;
        collect(rows)
    }

    async fn product_options(&self) -> Result<Vec<SelectOption>, RepositoryError> {
        let options =
            sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM products ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(options
            .into_iter()
            .map(|(id, name)| SelectOption { id, name })
            .collect())
    }

    async fn sku_taken(
        &self,
        sku: &str,
        except: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(sku)
        .bind(except)
        .fetch_one(self.pool())
        .await?;
        Ok(taken)
    }
}
