//! Business logic services for admin.
//!
//! # Services
//!
//! - `catalog` - Brands, categories and products
//! - `customers` - Customer records
//! - `orders` - Order aggregates and their line items
//!
//! Services borrow the store for the duration of a request. Every write is
//! validated against the resource's form schema first, then against the
//! store (unique values, references), and only then persisted.

pub mod catalog;
pub mod customers;
pub mod orders;

use thiserror::Error;
use tracing::debug;

use shopdesk_core::validation::label;
use shopdesk_core::{FieldErrors, Slug};

use crate::db::{RepositoryError, SlugScope, Store};

pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use orders::{OrderList, OrderService};

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Submitted data failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// The record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The write would break a constraint (record still referenced, unique
    /// value taken concurrently).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

/// Unwrap a field the schema marks as required.
pub(crate) fn present<T>(value: Option<T>, field: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| {
        ServiceError::Validation(FieldErrors::single(
            field,
            format!("The {} field is required.", label(field)),
        ))
    })
}

/// Trim a text value; blank becomes `None`.
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The "already taken" message for a unique field.
pub(crate) fn taken(field: &str) -> String {
    format!("The {} has already been taken.", label(field))
}

/// The "invalid selection" message for a reference field.
pub(crate) fn invalid_selection(field: &str) -> String {
    format!("The selected {} is invalid.", label(field))
}

/// Derive a slug from `name` that no other record in `scope` uses.
///
/// The first free slug of `base`, `base-2`, `base-3`, ... wins; `except`
/// is the record being updated.
pub(crate) async fn unique_slug(
    store: &dyn Store,
    scope: SlugScope,
    name: &str,
    except: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<Option<Slug>, RepositoryError> {
    let Ok(base) = Slug::from_name(name) else {
        errors.required("slug");
        return Ok(None);
    };
    if !store.slug_taken(scope, &base, except).await? {
        return Ok(Some(base));
    }

    let mut suffix = 2;
    loop {
        let candidate = base.with_suffix(suffix);
        if !store.slug_taken(scope, &candidate, except).await? {
            debug!(slug = %candidate, table = scope.table(), "Slug suffixed to stay unique");
            return Ok(Some(candidate));
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BrandStore, MemoryStore};
    use crate::models::BrandData;

    #[tokio::test]
    async fn test_unique_slug_appends_suffix() {
        let store = MemoryStore::new();
        for url in ["https://a.example", "https://b.example"] {
            let mut errors = FieldErrors::new();
            let slug = unique_slug(&store, SlugScope::Brands, "Acme Co", None, &mut errors)
                .await
                .unwrap()
                .unwrap();
            store
                .insert_brand(&BrandData {
                    name: "Acme Co".to_string(),
                    slug,
                    url: url.to_string(),
                    description: None,
                    is_visible: true,
                    primary_hex: None,
                })
                .await
                .unwrap();
        }

        let mut errors = FieldErrors::new();
        let third = unique_slug(&store, SlugScope::Brands, "Acme Co", None, &mut errors)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(third.as_str(), "acme-co-3");
    }

    #[tokio::test]
    async fn test_unique_slug_ignores_record_being_updated() {
        let store = MemoryStore::new();
        let mut errors = FieldErrors::new();
        let slug = unique_slug(&store, SlugScope::Brands, "Acme", None, &mut errors)
            .await
            .unwrap()
            .unwrap();
        let brand = store
            .insert_brand(&BrandData {
                name: "Acme".to_string(),
                slug,
                url: "https://acme.example".to_string(),
                description: None,
                is_visible: true,
                primary_hex: None,
            })
            .await
            .unwrap();

        let again = unique_slug(
            &store,
            SlugScope::Brands,
            "Acme",
            Some(brand.id.as_i64()),
            &mut errors,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(again.as_str(), "acme");
    }

    #[tokio::test]
    async fn test_name_without_alphanumerics_is_a_slug_error() {
        let store = MemoryStore::new();
        let mut errors = FieldErrors::new();
        let slug = unique_slug(&store, SlugScope::Brands, "!!!", None, &mut errors)
            .await
            .unwrap();
        assert!(slug.is_none());
        assert_eq!(errors.get("slug"), ["The slug field is required."]);
    }

    #[test]
    fn test_repository_errors_map() {
        assert!(matches!(
            ServiceError::from(RepositoryError::Conflict("x".to_string())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound(_)
        ));
    }
}
