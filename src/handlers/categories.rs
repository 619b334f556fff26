//! Category handlers. Reads are public, writes are admin-only.

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::Category;
use crate::response;
use crate::services::products::slugify;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories: Vec<Category> =
        sqlx::query_as("SELECT * FROM categories ORDER BY category")
            .fetch_all(&state.pool)
            .await?;
    Ok(response::ok(categories))
}

/// POST /api/categories (admin)
pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    let name = crate::validation::required("category", body.category.as_deref())?;
    let slug = slugify(&name);

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE cat_slug = $1")
        .bind(&slug)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category: Category = sqlx::query_as(
        r#"
        INSERT INTO categories (category, cat_slug, description, status)
        VALUES ($1, $2, $3, COALESCE($4, 'active'))
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&slug)
    .bind(&body.description)
    .bind(&body.status)
    .fetch_one(&state.pool)
    .await?;
    Ok(response::created("Category created successfully", category))
}

/// PUT /api/categories/:id (admin)
pub async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    let slug = body.category.as_deref().map(slugify);
    let category: Option<Category> = sqlx::query_as(
        r#"
        UPDATE categories SET
            category = COALESCE($1, category),
            cat_slug = COALESCE($2, cat_slug),
            description = COALESCE($3, description),
            status = COALESCE($4, status),
            updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(&body.category)
    .bind(&slug)
    .bind(&body.description)
    .bind(&body.status)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    let category = category.ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    Ok(response::ok_message("Category updated successfully", category))
}

/// DELETE /api/categories/:id (admin)
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let product_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if product_count > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete category with existing products".into(),
        ));
    }
    let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }
    Ok(response::message_only("Category deleted successfully"))
}
