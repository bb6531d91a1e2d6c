//! Brand API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tracing::instrument;

use shopdesk_core::BrandId;

use super::{BulkDeleteRequest, BulkDeleteResponse, Params, parse_input};
use crate::error::AppError;
use crate::models::{Brand, BrandInput, Page, SelectOption};
use crate::resources::Resource;
use crate::state::AppState;

/// Build the brands router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/brands", get(index).post(store))
        .route("/api/brands/options", get(options))
        .route("/api/brands/bulk-delete", post(bulk_delete))
        .route("/api/brands/{id}", get(show).put(update).delete(destroy))
}

/// List brands.
///
/// # Errors
///
/// Returns 400 for malformed query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Page<Brand>>, AppError> {
    let query = Resource::Brands
        .schema()
        .list_query(&params, state.config().per_page)?;
    Ok(Json(state.catalog().list_brands(&query).await?))
}

/// Create a brand.
///
/// # Errors
///
/// Returns 422 with field messages for invalid input.
#[instrument(skip(state, body))]
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Brand>), AppError> {
    let input: BrandInput = parse_input(&Resource::Brands.schema().form, &body)?;
    let brand = state.catalog().create_brand(&input).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// Get a brand.
///
/// # Errors
///
/// Returns 404 if the brand does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Brand>, AppError> {
    Ok(Json(state.catalog().get_brand(BrandId::new(id)).await?))
}

/// Replace a brand.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Brand>, AppError> {
    let input: BrandInput = parse_input(&Resource::Brands.schema().form, &body)?;
    Ok(Json(
        state.catalog().update_brand(BrandId::new(id), &input).await?,
    ))
}

/// Delete a brand.
///
/// # Errors
///
/// Returns 404, or 409 while the brand owns products.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_brand(BrandId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several brands.
///
/// # Errors
///
/// Returns 409 if any brand owns products; nothing is deleted then.
#[instrument(skip(state))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted = state.catalog().bulk_delete_brands(&body.typed()).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Brands as select options.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn options(State(state): State<AppState>) -> Result<Json<Vec<SelectOption>>, AppError> {
    Ok(Json(state.catalog().brand_options().await?))
}
