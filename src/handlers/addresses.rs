//! Address book handlers, always scoped to the authenticated user.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::response;
use crate::services::addresses::AddressInput;
use crate::services::AddressService;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

/// GET /api/addresses/user/addresses
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(
        AddressService::list(&state.pool, auth.id()).await?,
    ))
}

/// GET /api/addresses/user/addresses/default
pub async fn get_default(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressService::get_default(&state.pool, auth.id())
        .await?
        .ok_or_else(|| AppError::NotFound("No default address found".into()))?;
    Ok(response::ok(address))
}

/// GET /api/addresses/user/addresses/:id
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressService::get(&state.pool, auth.id(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".into()))?;
    Ok(response::ok(address))
}

/// POST /api/addresses/user/addresses
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AddressInput>,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressService::create(&state.pool, auth.id(), &body).await?;
    Ok(response::created("Address created successfully", address))
}

/// PUT /api/addresses/user/addresses/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<AddressInput>,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressService::update(&state.pool, auth.id(), id, &body).await?;
    Ok(response::ok_message("Address updated successfully", address))
}

/// PUT /api/addresses/user/addresses/:id/default
pub async fn set_default(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressService::set_default(&state.pool, auth.id(), id).await?;
    Ok(response::ok_message("Default address updated", address))
}

/// DELETE /api/addresses/user/addresses/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    AddressService::delete(&state.pool, auth.id(), id).await?;
    Ok(response::message_only("Address deleted successfully"))
}
