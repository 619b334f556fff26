//! Product catalog handlers.

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::handlers::request_base_url;
use crate::handlers::uploads::collect_multipart;
use crate::response::{self, pagination};
use crate::services::products::{present, ProductInput, ProductListParams};
use crate::services::ProductService;
use crate::state::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::{response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, page, limit) = ProductService::list(&state.pool, &params).await?;
    let base = request_base_url(&headers, &state.config);
    let products: Vec<Value> = rows.iter().map(|r| present(r, &base)).collect();
    Ok(Json(json!({
        "success": true,
        "data": {
            "products": products,
            "pagination": pagination(page, limit, total),
        },
    })))
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/products/search?q=
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let term = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".into()))?;
    let rows = ProductService::search(&state.pool, term, params.limit.unwrap_or(10)).await?;
    let base = request_base_url(&headers, &state.config);
    let products: Vec<Value> = rows.iter().map(|r| present(r, &base)).collect();
    Ok(response::ok(products))
}

/// GET /api/products/stats (admin)
pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(ProductService::stats(&state.pool).await?))
}

/// GET /api/products/:id, by numeric id or slug.
pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id_or_slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let row = ProductService::get(&state.pool, &id_or_slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    let base = request_base_url(&headers, &state.config);
    Ok(response::ok(present(&row, &base)))
}

fn input_from_fields(fields: serde_json::Map<String, Value>) -> Result<ProductInput, AppError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::BadRequest(format!("invalid product payload: {e}")))
}

/// POST /api/products (admin, multipart with image files)
pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = collect_multipart(&mut multipart, &state.config.uploads_dir, "products").await?;
    let input = input_from_fields(form.fields)?;
    let product = ProductService::create(&state.pool, &input, form.files).await?;
    Ok(response::created("Product created successfully", product))
}

/// PUT /api/products/:id (admin, multipart)
pub async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = collect_multipart(&mut multipart, &state.config.uploads_dir, "products").await?;
    let input = input_from_fields(form.fields)?;
    let product = ProductService::update(&state.pool, id, &input, form.files).await?;
    Ok(response::ok_message("Product updated successfully", product))
}

/// DELETE /api/products/:id (admin)
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ProductService::delete(&state.pool, id).await?;
    Ok(response::message_only("Product deleted successfully"))
}

/// GET /api/products/export (admin): the raw catalog as JSON.
pub async fn export(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(response::ok(ProductService::export(&state.pool).await?))
}

/// POST /api/products/import (admin): upsert an exported JSON array.
pub async fn import(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let items = body
        .as_array()
        .ok_or_else(|| AppError::BadRequest("body must be a JSON array".into()))?;
    let outcome = ProductService::import(&state.pool, items).await?;
    Ok(response::ok_message("Products imported successfully", outcome))
}
