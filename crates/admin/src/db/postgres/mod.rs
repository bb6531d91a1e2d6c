//! `PostgreSQL` store.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database. List queries are assembled with
//! [`sqlx::QueryBuilder`]; only column keys found in each table's column map
//! ever reach the SQL text, everything user-supplied is bound.

mod brands;
mod categories;
mod customers;
mod orders;
mod products;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use shopdesk_core::{Price, Slug};

use super::{RepositoryError, SlugScope, SlugStore, Store};
use crate::models::{Direction, ListQuery};

/// Column key to SQL expression, per table.
pub(crate) type Columns = &'static [(&'static str, &'static str)];

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map constraint violations to `Conflict`, everything else to `Database`.
pub(crate) fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            // unique_violation
            Some("23505") => {
                return RepositoryError::Conflict(
                    db.constraint()
                        .map_or_else(|| "unique value already exists".to_string(), |c| {
                            format!("{c} already exists")
                        }),
                );
            }
            // foreign_key_violation
            Some("23503") => {
                return RepositoryError::Conflict(
                    db.constraint()
                        .map_or_else(|| "row is still referenced".to_string(), |c| {
                            format!("{c} violated")
                        }),
                );
            }
            _ => {}
        }
    }
    RepositoryError::Database(err)
}

/// Decode a stored amount.
pub(crate) fn price(amount: Decimal, column: &str) -> Result<Price, RepositoryError> {
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Decode a stored slug.
pub(crate) fn slug(value: &str) -> Result<Slug, RepositoryError> {
    Slug::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid slug in database: {e}")))
}

fn column(columns: Columns, key: &str) -> Option<&'static str> {
    columns
        .iter()
        .find_map(|(k, expr)| (*k == key).then_some(*expr))
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append ` AND (col ILIKE $n OR ...)` for the query's search, if any.
///
/// The builder must already hold a `WHERE` clause.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery, columns: Columns) {
    let Some(needle) = query.needle() else {
        return;
    };
    let exprs: Vec<&str> = query
        .search_columns
        .iter()
        .filter_map(|key| column(columns, key))
        .collect();
    if exprs.is_empty() {
        return;
    }

    let pattern = format!("%{}%", escape_like(&needle));
    qb.push(" AND (");
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(format!("CAST({expr} AS TEXT) ILIKE "));
        qb.push_bind(pattern.clone());
    }
    qb.push(")");
}

/// Append `ORDER BY`, `LIMIT` and `OFFSET`.
pub(crate) fn push_order_and_page(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery,
    columns: Columns,
    id_column: &str,
) {
    match query
        .sort
        .as_ref()
        .and_then(|(key, dir)| column(columns, key).map(|expr| (expr, dir)))
    {
        Some((expr, dir)) => {
            // Nulls sort as the smallest value in both directions.
            let nulls = match dir {
                Direction::Asc => "NULLS FIRST",
                Direction::Desc => "NULLS LAST",
            };
            let dir = dir.as_sql();
            qb.push(format!(
                " ORDER BY {expr} {dir} {nulls}, {id_column} {dir}"
            ));
        }
        None => {
            qb.push(format!(" ORDER BY {id_column} DESC"));
        }
    }
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(query.per_page));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
}

/// Convert a `COUNT(*)` result.
pub(crate) fn count(total: i64) -> u64 {
    u64::try_from(total).unwrap_or_default()
}

#[async_trait]
impl SlugStore for PgStore {
    async fn slug_taken(
        &self,
        scope: SlugScope,
        slug: &Slug,
        except: Option<i64>,
    ) -> Result<bool, RepositoryError> {
        // Table name comes from a closed enum.
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
            scope.table()
        );
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(slug.as_str())
            .bind(except)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: Columns = &[("name", "t.name"), ("created_at", "t.created_at")];

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_search_uses_known_columns_only() {
        let query = ListQuery {
            search: Some("Shoe".to_string()),
            search_columns: vec!["name".to_string(), "nope; DROP TABLE".to_string()],
            ..ListQuery::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE TRUE");
        push_search(&mut qb, &query, COLUMNS);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM t WHERE TRUE AND (CAST(t.name AS TEXT) ILIKE $1)"
        );
    }

    #[test]
    fn test_order_and_page() {
        let query = ListQuery {
            sort: Some(("created_at".to_string(), Direction::Desc)),
            page: 3,
            per_page: 25,
            ..ListQuery::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE TRUE");
        push_order_and_page(&mut qb, &query, COLUMNS, "t.id");
        assert_eq!(
            qb.sql(),
            "SELECT * FROM t WHERE TRUE ORDER BY t.created_at DESC NULLS LAST, t.id DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_unknown_sort_falls_back_to_newest() {
        let query = ListQuery {
            sort: Some(("password".to_string(), Direction::Asc)),
            ..ListQuery::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE TRUE");
        push_order_and_page(&mut qb, &query, COLUMNS, "t.id");
        assert!(qb.sql().contains("ORDER BY t.id DESC"));
    }
}
