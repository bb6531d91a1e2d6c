//! Category API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tracing::instrument;

use shopdesk_core::CategoryId;

use super::{BulkDeleteRequest, BulkDeleteResponse, Params, parse_input};
use crate::error::AppError;
use crate::models::{Category, CategoryInput, CategoryNode, Page, SelectOption};
use crate::resources::Resource;
use crate::state::AppState;

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index).post(store))
        .route("/api/categories/tree", get(tree))
        .route("/api/categories/options", get(options))
        .route("/api/categories/bulk-delete", post(bulk_delete))
        .route(
            "/api/categories/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// List categories.
///
/// # Errors
///
/// Returns 400 for malformed query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Page<Category>>, AppError> {
    let query = Resource::Categories
        .schema()
        .list_query(&params, state.config().per_page)?;
    Ok(Json(state.catalog().list_categories(&query).await?))
}

/// The category forest.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryNode>>, AppError> {
    Ok(Json(state.catalog().category_tree().await?))
}

/// Create a category.
///
/// # Errors
///
/// Returns 422 with field messages for invalid input.
#[instrument(skip(state, body))]
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let input: CategoryInput = parse_input(&Resource::Categories.schema().form, &body)?;
    let category = state.catalog().create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Get a category.
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.catalog().get_category(CategoryId::new(id)).await?))
}

/// Replace a category.
///
/// # Errors
///
/// Returns 404, or 422 (including a parent that would create a cycle).
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Category>, AppError> {
    let input: CategoryInput = parse_input(&Resource::Categories.schema().form, &body)?;
    Ok(Json(
        state
            .catalog()
            .update_category(CategoryId::new(id), &input)
            .await?,
    ))
}

/// Delete a category.
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_category(CategoryId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several categories.
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted = state
        .catalog()
        .bulk_delete_categories(&body.typed())
        .await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Categories as select options.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn options(State(state): State<AppState>) -> Result<Json<Vec<SelectOption>>, AppError> {
    Ok(Json(state.catalog().category_options().await?))
}
