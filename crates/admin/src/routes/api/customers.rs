//! Customer API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tracing::instrument;

use shopdesk_core::CustomerId;

use super::{BulkDeleteRequest, BulkDeleteResponse, Params, parse_input};
use crate::error::AppError;
use crate::models::{Customer, CustomerInput, Page, SelectOption};
use crate::resources::Resource;
use crate::state::AppState;

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(index).post(store))
        .route("/api/customers/options", get(options))
        .route("/api/customers/bulk-delete", post(bulk_delete))
        .route(
            "/api/customers/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// List customers.
///
/// # Errors
///
/// Returns 400 for malformed query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Page<Customer>>, AppError> {
    let query = Resource::Customers
        .schema()
        .list_query(&params, state.config().per_page)?;
    Ok(Json(state.customers().list(&query).await?))
}

/// Create a customer.
///
/// # Errors
///
/// Returns 422 with field messages for invalid input.
#[instrument(skip(state, body))]
pub async fn store(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let input: CustomerInput = parse_input(&Resource::Customers.schema().form, &body)?;
    let customer = state.customers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Get a customer.
///
/// # Errors
///
/// Returns 404 if the customer does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.customers().get(CustomerId::new(id)).await?))
}

/// Replace a customer.
///
/// # Errors
///
/// Returns 404 or 422.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Customer>, AppError> {
    let input: CustomerInput = parse_input(&Resource::Customers.schema().form, &body)?;
    Ok(Json(
        state
            .customers()
            .update(CustomerId::new(id), &input)
            .await?,
    ))
}

/// Delete a customer and their orders.
///
/// # Errors
///
/// Returns 404 if the customer does not exist.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.customers().delete(CustomerId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several customers.
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted = state.customers().bulk_delete(&body.typed()).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Customers as select options.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn options(State(state): State<AppState>) -> Result<Json<Vec<SelectOption>>, AppError> {
    Ok(Json(state.customers().options().await?))
}
