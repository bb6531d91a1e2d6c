//! JSON API route handlers for admin.
//!
//! Request bodies are JSON objects keyed by form field name. They are
//! normalized and validated against the resource's form schema before being
//! handed to the services, so the API and the HTML forms accept the same
//! shapes and report the same messages.

pub mod brands;
pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::Path,
    routing::get,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shopdesk_core::FieldErrors;

use crate::error::AppError;
use crate::resources::{FormSchema, Resource, ResourceSchema};
use crate::state::AppState;

/// Query string parameters of list endpoints.
pub type Params = HashMap<String, String>;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/schema/{resource}", get(schema))
        .merge(brands::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(customers::router())
        .merge(orders::router())
}

/// Request body of the bulk-delete endpoints.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

impl BulkDeleteRequest {
    /// The IDs as typed IDs.
    pub fn typed<T: From<i64>>(&self) -> Vec<T> {
        self.ids.iter().copied().map(T::from).collect()
    }
}

/// Response of the bulk-delete endpoints.
#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// Normalize, validate and deserialize a submitted record.
///
/// # Errors
///
/// Returns `AppError::Validation` with per-field messages.
pub fn parse_input<T: DeserializeOwned>(form: &FormSchema, raw: &Value) -> Result<T, AppError> {
    let normalized = form.normalize(raw);
    form.validate(&normalized).into_result()?;
    serde_json::from_value(normalized).map_err(|e| {
        AppError::Validation(FieldErrors::single(
            "input",
            format!("The input is invalid: {e}."),
        ))
    })
}

/// Table and form schema of a resource.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown resource.
pub async fn schema(Path(resource): Path<String>) -> Result<Json<&'static ResourceSchema>, AppError> {
    Resource::from_slug(&resource)
        .map(|r| Json(r.schema()))
        .ok_or_else(|| AppError::NotFound(format!("unknown resource: {resource}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductInput;
    use serde_json::json;

    #[test]
    fn test_parse_input_normalizes_before_deserializing() {
        let form = &Resource::Products.schema().form;
        let input: ProductInput = parse_input(
            form,
            &json!({
                "name": "  Shoe ",
                "sku": "SH-1",
                "price": 12.5,
                "quantity": "3",
                "type": "deliverable",
                "slug": "ignored",
                "category_ids": "4",
            }),
        )
        .unwrap();
        assert_eq!(input.name.as_deref(), Some("Shoe"));
        assert_eq!(input.quantity, Some(3));
        assert_eq!(input.category_ids.map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_parse_input_reports_rule_failures() {
        let form = &Resource::Products.schema().form;
        let err = parse_input::<ProductInput>(form, &json!({"quantity": 150})).unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("name"));
        assert_eq!(
            errors.get("quantity"),
            ["The quantity field must not be greater than 100."]
        );
    }
}
