//! Order handlers. Everything here requires authentication; status
//! updates and stats are admin-only.

use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::models::OrderStatus;
use crate::response::{self, pagination};
use crate::services::orders::CreateOrderRequest;
use crate::services::OrderService;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if auth.is_admin() {
        return Err(AppError::Forbidden(
            "Admins cannot create orders. Please use a regular user account.".into(),
        ));
    }
    let order = OrderService::create(&state.pool, auth.id(), &body).await?;
    Ok(response::created("Order created successfully", order))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub user_id: Option<i64>,
}

/// GET /api/orders: own orders; admins may pass userId.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = if auth.is_admin() {
        params.user_id.unwrap_or(auth.id())
    } else {
        auth.id()
    };
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let (orders, total) =
        OrderService::list(&state.pool, user_id, params.status.as_deref(), page, limit).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "orders": orders,
            "pagination": pagination(page, limit, total),
        },
    })))
}

/// GET /api/orders/stats (admin)
pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(OrderService::stats(&state.pool).await?))
}

/// GET /api/orders/:id, scoped to the owner unless admin.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let restrict = (!auth.is_admin()).then(|| auth.id());
    let order = OrderService::detail(&state.pool, id, restrict, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    Ok(response::ok(order))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub comment: Option<String>,
    pub tracking_number: Option<String>,
}

/// PATCH /api/orders/:id/status (admin)
pub async fn update_status(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: OrderStatus = body
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;
    let changed_by = admin
        .0
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "admin".into());
    let order = OrderService::update_status(
        &state.pool,
        id,
        status,
        body.comment.as_deref(),
        body.tracking_number.as_deref(),
        &changed_by,
    )
    .await?;
    Ok(response::ok_message("Order status updated successfully", order))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /api/orders/:id/cancel: owner or admin, pre-fulfilment only.
/// The body is optional; storefront clients sometimes post without one.
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    body: Option<Json<CancelRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let reason = body.as_ref().and_then(|b| b.reason.clone());
    let restrict = (!auth.is_admin()).then(|| auth.id());
    let changed_by = auth.display_name();
    let order =
        OrderService::cancel(&state.pool, id, restrict, reason.as_deref(), &changed_by).await?;
    Ok(response::ok_message("Order cancelled successfully", order))
}
