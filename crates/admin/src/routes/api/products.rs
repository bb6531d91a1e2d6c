//! Product API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tracing::instrument;

use shopdesk_core::ProductId;

use super::{BulkDeleteRequest, BulkDeleteResponse, Params, parse_input};
use crate::error::AppError;
use crate::models::{Page, Product, ProductInput, SearchHit, SelectOption};
use crate::resources::{Resource, products};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(index).post(store))
        .route("/api/products/search", get(search))
        .route("/api/products/options", get(options))
        .route("/api/products/bulk-delete", post(bulk_delete))
        .route("/api/products/{id}", get(show).put(update).delete(destroy))
}

/// List products, filtered by `is_visible` and `brand_id`.
///
/// # Errors
///
/// Returns 400 for malformed query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Page<Product>>, AppError> {
    let query = Resource::Products
        .schema()
        .list_query(&params, state.config().per_page)?;
    let filter = products::filter(&params)?;
    Ok(Json(state.catalog().list_products(&query, &filter).await?))
}

/// Global product search (`?q=`).
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    let needle = params.get("q").map_or("", String::as_str);
    Ok(Json(state.catalog().search_products(needle).await?))
}

/// Create a product.
///
/// # Errors
///
/// Returns 422 with field messages for invalid input.
#[instrument(skip(state, body))]
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let input: ProductInput = parse_input(&Resource::Products.schema().form, &body)?;
    let product = state.catalog().create_product(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().get_product(ProductId::new(id)).await?))
}

/// Replace a product and its category links.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Product>, AppError> {
    let input: ProductInput = parse_input(&Resource::Products.schema().form, &body)?;
    Ok(Json(
        state
            .catalog()
            .update_product(ProductId::new(id), &input)
            .await?,
    ))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404, or 409 if the product appears on an order.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_product(ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several products.
///
/// # Errors
///
/// Returns 409 if any product appears on an order; nothing is deleted then.
#[instrument(skip(state))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted = state.catalog().bulk_delete_products(&body.typed()).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Products as select options.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn options(State(state): State<AppState>) -> Result<Json<Vec<SelectOption>>, AppError> {
    Ok(Json(state.catalog().product_options().await?))
}
