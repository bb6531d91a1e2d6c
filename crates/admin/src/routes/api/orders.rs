//! Order API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde_json::Value;
use tracing::instrument;

use shopdesk_core::{OrderId, OrderItemId};

use super::{BulkDeleteRequest, BulkDeleteResponse, Params, parse_input};
use crate::error::AppError;
use crate::models::{Order, OrderInput, OrderItemInput};
use crate::resources::orders::{self, item_form};
use crate::resources::Resource;
use crate::services::OrderList;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(index).post(store))
        .route("/api/orders/bulk-delete", post(bulk_delete))
        .route("/api/orders/{id}", get(show).put(update).delete(destroy))
        .route("/api/orders/{id}/restore", post(restore))
        .route("/api/orders/{id}/force", delete(force_destroy))
        .route("/api/orders/{id}/items", post(add_item))
        .route(
            "/api/orders/{id}/items/{item_id}",
            put(update_item).delete(remove_item),
        )
}

/// List orders with the `total_price` sum over the filtered set.
///
/// # Errors
///
/// Returns 400 for malformed query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<OrderList>, AppError> {
    let query = Resource::Orders
        .schema()
        .list_query(&params, state.config().per_page)?;
    let filter = orders::filter(&params)?;
    Ok(Json(state.orders().list(&query, &filter).await?))
}

/// Create an order with its items.
///
/// # Errors
///
/// Returns 422 with field messages for invalid input.
#[instrument(skip(state, body))]
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let input: OrderInput = parse_input(&Resource::Orders.schema().form, &body)?;
    let order = state.orders().create(&input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its items (trashed orders included).
///
/// # Errors
///
/// Returns 404 if the order does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders().get(OrderId::new(id)).await?))
}

/// Update an order and, when `items` is present, sync its items.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Order>, AppError> {
    let input: OrderInput = parse_input(&Resource::Orders.schema().form, &body)?;
    Ok(Json(state.orders().update(OrderId::new(id), &input).await?))
}

/// Soft-delete an order.
///
/// # Errors
///
/// Returns 404 for unknown or already trashed orders.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.orders().delete(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted order.
///
/// # Errors
///
/// Returns 404 if the order does not exist.
#[instrument(skip(state))]
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders().restore(OrderId::new(id)).await?))
}

/// Delete an order permanently.
///
/// # Errors
///
/// Returns 404 if the order does not exist.
#[instrument(skip(state))]
pub async fn force_destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.orders().force_delete(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete several orders.
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted = state.orders().bulk_delete(&body.typed()).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Add a line item.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let input: OrderItemInput = parse_input(&item_form(), &body)?;
    let order = state.orders().add_item(OrderId::new(id), &input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Change a line item's product or quantity.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(body): Json<Value>,
) -> Result<Json<Order>, AppError> {
    let input: OrderItemInput = parse_input(&item_form(), &body)?;
    Ok(Json(
        state
            .orders()
            .update_item(OrderId::new(id), OrderItemId::new(item_id), &input)
            .await?,
    ))
}

/// Remove a line item.
///
/// # Errors
///
/// Returns 404 if the order or item does not exist.
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(
        state
            .orders()
            .remove_item(OrderId::new(id), OrderItemId::new(item_id))
            .await?,
    ))
}
