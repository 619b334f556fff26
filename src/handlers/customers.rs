//! Customer CRM handlers (admin panel only).

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::response::{self, pagination};
use crate::services::customers::{CustomerInput, CustomerListParams};
use crate::services::CustomerService;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /api/customers
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (customers, total, page, limit) = CustomerService::list(&state.pool, &params).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "customers": customers,
            "pagination": pagination(page, limit, total),
        },
    })))
}

/// GET /api/customers/stats
pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(CustomerService::stats(&state.pool).await?))
}

/// GET /api/customers/:id
pub async fn get(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let customer = CustomerService::get(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".into()))?;
    Ok(response::ok(customer))
}

/// POST /api/customers
pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    let customer = CustomerService::create(&state.pool, &body).await?;
    Ok(response::created("Customer created successfully", customer))
}

/// PUT /api/customers/:id
pub async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    let customer = CustomerService::update(&state.pool, id, &body).await?;
    Ok(response::ok_message("Customer updated successfully", customer))
}

/// DELETE /api/customers/:id
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    CustomerService::delete(&state.pool, id).await?;
    Ok(response::message_only("Customer deleted successfully"))
}
