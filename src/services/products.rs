//! Catalog: dynamic product listing, slug generation, CRUD, JSON
//! import/export, statistics.

use crate::error::AppError;
use crate::models::{Category, Product, ProductVariant};
use crate::sql::{like_pattern, limit_offset, order_by, PgArg, QueryBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;

const DEFAULT_PAGE_SIZE: u32 = 12;
const IMPORT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub availability: Option<String>,
    pub status: Option<String>,
    pub featured: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub color: Option<String>,
}

/// Create/update payload. Variants and specifications may arrive either as
/// JSON arrays or as JSON-encoded strings (the admin panel submits
/// multipart forms), so they stay `Value` until parsed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub cat_slug: Option<String>,
    pub category_id: Option<Value>,
    pub variants: Option<Value>,
    pub specifications: Option<Value>,
    pub status: Option<String>,
    pub availability: Option<String>,
    pub featured: Option<Value>,
    pub material: Option<String>,
    pub style: Option<String>,
    /// Number or numeric string (multipart form fields arrive as text).
    pub low_stock_threshold: Option<Value>,
    pub seo_title: Option<String>,
    pub meta_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub keywords: Option<String>,
    pub existing_images: Option<Value>,
}

/// Product row plus the joined category columns.
#[derive(Debug, sqlx::FromRow)]
pub struct ProductWithCategory {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatsOverview {
    pub total_products: i64,
    pub active_products: i64,
    pub out_of_stock_products: i64,
    pub featured_products: i64,
    pub low_stock_products: i64,
}

#[derive(Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopSellingProduct {
    pub id: i64,
    pub name: String,
    pub sales_count: i64,
    pub images: Value,
}

#[derive(Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub cat_slug: Option<String>,
    pub count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub overview: ProductStatsOverview,
    pub top_selling_products: Vec<TopSellingProduct>,
    pub products_by_category: Vec<CategoryCount>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// URL-safe slug: lowercase, alphanumerics and hyphens only.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if (c == ' ' || c == '-') && !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Coerce a JSON field that may be an array or a JSON-encoded string.
fn json_array(field: &str, raw: &Value) -> Result<Vec<Value>, AppError> {
    let parsed = match raw {
        Value::Array(items) => items.clone(),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.as_array().cloned())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {field} format")))?,
        _ => return Err(AppError::BadRequest(format!("Invalid {field} format"))),
    };
    Ok(parsed)
}

fn number_field(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer_field(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize and validate the variants payload.
pub fn parse_variants(raw: &Value) -> Result<Vec<ProductVariant>, AppError> {
    let items = json_array("variants", raw)?;
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Variants must be a non-empty array".into(),
        ));
    }
    let invalid = || {
        AppError::BadRequest(
            "All variants must have a valid color, size, type, price, and non-negative quantity"
                .into(),
        )
    };
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        let obj = item.as_object().ok_or_else(invalid)?;
        let text = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let color = text("color").ok_or_else(invalid)?;
        let size = text("size").ok_or_else(invalid)?;
        let kind = text("type").ok_or_else(invalid)?;
        let price = obj.get("price").and_then(number_field).ok_or_else(invalid)?;
        let quantity = obj
            .get("quantity")
            .and_then(integer_field)
            .unwrap_or(0);
        if price < 0.0 || quantity < 0 {
            return Err(invalid());
        }
        out.push(ProductVariant {
            color,
            size,
            kind,
            price,
            original_price: obj.get("originalPrice").and_then(number_field),
            quantity,
        });
    }
    Ok(out)
}

/// Normalize specifications into the stored `{"Fabric": ...}` entries.
pub fn parse_specifications(raw: &Value) -> Result<Vec<Value>, AppError> {
    let items = json_array("specifications", raw)?;
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Specifications must be a non-empty array".into(),
        ));
    }
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        let fabric = item
            .get("value")
            .or_else(|| item.get("Fabric"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match fabric {
            Some(f) => out.push(json!({ "Fabric": f })),
            None => {
                return Err(AppError::BadRequest(
                    "All specifications must have a valid Fabric".into(),
                ))
            }
        }
    }
    Ok(out)
}

fn coerce_bool(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Absolute URL for a stored image path.
fn absolutize(path: &str, base_url: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), path)
    }
}

/// API projection: absolutized image URLs, convenience `image` field, and
/// joined category name/slug, matching what both frontends expect.
pub fn present(row: &ProductWithCategory, base_url: &str) -> Value {
    let mut value = serde_json::to_value(&row.product).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        let images: Vec<Value> = row
            .product
            .images
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(|p| Value::String(absolutize(p, base_url)))
                    .collect()
            })
            .unwrap_or_default();
        obj.insert(
            "image".into(),
            images.first().cloned().unwrap_or(Value::Null),
        );
        obj.insert("images".into(), Value::Array(images));
        if let Some(secondary) = &row.product.secondary_image {
            obj.insert(
                "secondaryImage".into(),
                Value::String(absolutize(secondary, base_url)),
            );
        }
        if let Some(name) = &row.category_name {
            obj.insert("categoryName".into(), Value::String(name.clone()));
        }
        if let Some(slug) = &row.category_slug {
            obj.insert("catSlug".into(), Value::String(slug.clone()));
        }
    }
    value
}

const SELECT_WITH_CATEGORY: &str = "SELECT p.*, c.category AS category_name, c.cat_slug AS category_slug FROM products p LEFT JOIN categories c ON c.id = p.category_id";

pub struct ProductService;

impl ProductService {
    pub async fn list(
        pool: &PgPool,
        params: &ProductListParams,
    ) -> Result<(Vec<ProductWithCategory>, i64, u32, u32), AppError> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

        let mut q = QueryBuf::new();
        if let Some(status) = &params.status {
            q.condition("p.status = {}", PgArg::Text(status.clone()));
        }
        if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
            q.any_of(
                &[
                    "p.name ILIKE {}",
                    "p.description ILIKE {}",
                    "p.brand ILIKE {}",
                ],
                PgArg::Text(like_pattern(search.trim())),
            );
        }
        if let Some(category) = params.category.as_deref().filter(|s| !s.is_empty()) {
            // Numeric value targets the id, anything else the slug.
            match category.parse::<i64>() {
                Ok(id) => q.condition("p.category_id = {}", PgArg::I64(id)),
                Err(_) => q.condition("p.cat_slug = {}", PgArg::Text(category.to_string())),
            }
        }
        if let Some(brand) = &params.brand {
            q.condition("p.brand = {}", PgArg::Text(brand.clone()));
        }
        if let Some(availability) = &params.availability {
            q.condition("p.availability = {}", PgArg::Text(availability.clone()));
        }
        if let Some(material) = &params.material {
            q.condition("p.material = {}", PgArg::Text(material.clone()));
        }
        if let Some(style) = &params.style {
            q.condition("p.style = {}", PgArg::Text(style.clone()));
        }
        if let Some(featured) = &params.featured {
            q.condition("p.featured = {}", PgArg::Bool(featured == "true"));
        }
        if let Some(color) = &params.color {
            q.condition(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(p.variants) v WHERE v->>'color' ILIKE {})",
                PgArg::Text(like_pattern(color)),
            );
        }
        if let Some(size) = &params.size {
            q.condition(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(p.variants) v WHERE v->>'size' ILIKE {})",
                PgArg::Text(like_pattern(size)),
            );
        }
        if let Some(min) = params.min_price {
            q.condition(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(p.variants) v WHERE (v->>'price')::float8 >= {})",
                PgArg::F64(min),
            );
        }
        if let Some(max) = params.max_price {
            q.condition(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(p.variants) v WHERE (v->>'price')::float8 <= {})",
                PgArg::F64(max),
            );
        }

        let mut count = QueryBuf::new();
        count.sql = format!("SELECT COUNT(*) FROM products p{}", q.where_clause());
        count.params = q.params.clone();
        let total: i64 = count.query_scalar().fetch_one(pool).await?;

        let order = order_by(
            params.sort_by.as_deref(),
            params.sort_order.as_deref(),
            &[
                ("createdAt", "p.created_at"),
                ("name", "p.name"),
                ("salesCount", "p.sales_count"),
                ("viewCount", "p.view_count"),
                ("featured", "p.featured"),
            ],
            "p.created_at",
        );
        q.sql = format!(
            "{SELECT_WITH_CATEGORY}{}{order}{}",
            q.where_clause(),
            limit_offset(page, limit)
        );
        let rows: Vec<ProductWithCategory> = q.query_as().fetch_all(pool).await?;
        Ok((rows, total, page, limit))
    }

    /// Fetch by numeric id or slug, bumping the view counter.
    pub async fn get(
        pool: &PgPool,
        id_or_slug: &str,
    ) -> Result<Option<ProductWithCategory>, AppError> {
        let mut q = QueryBuf::new();
        if let Ok(id) = id_or_slug.parse::<i64>() {
            q.condition("p.id = {}", PgArg::I64(id));
        } else {
            q.condition("p.slug = {}", PgArg::Text(id_or_slug.to_string()));
        }
        q.sql = format!("{SELECT_WITH_CATEGORY}{}", q.where_clause());
        let row: Option<ProductWithCategory> = q.query_as().fetch_optional(pool).await?;
        if let Some(row) = &row {
            sqlx::query("UPDATE products SET view_count = view_count + 1 WHERE id = $1")
                .bind(row.product.id)
                .execute(pool)
                .await?;
        }
        Ok(row)
    }

    pub async fn create(
        pool: &PgPool,
        input: &ProductInput,
        uploaded_images: Vec<String>,
    ) -> Result<Product, AppError> {
        let name = crate::validation::required("name", input.name.as_deref())?;
        let category = Self::resolve_category(pool, input).await?;
        let category =
            category.ok_or_else(|| AppError::BadRequest("categoryId is required".into()))?;

        let variants_raw = input
            .variants
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Variants must be a non-empty array".into()))?;
        let variants = parse_variants(variants_raw)?;
        let specifications_raw = input.specifications.as_ref().ok_or_else(|| {
            AppError::BadRequest("Specifications must be a non-empty array".into())
        })?;
        let specifications = parse_specifications(specifications_raw)?;

        let slug = Self::unique_slug(
            pool,
            input.slug.as_deref().unwrap_or(&slugify(&name)),
            None,
        )
        .await?;

        let secondary_image = uploaded_images.get(1).cloned();
        let variants_json = serde_json::to_value(&variants)
            .map_err(|e| AppError::Internal(format!("variants: {e}")))?;

        let product: Product = sqlx::query_as(
            r#"
            INSERT INTO products (name, slug, description, brand, category_id, cat_slug,
                                  images, secondary_image, variants, specifications,
                                  status, availability, featured, material, style,
                                  low_stock_threshold, seo_title, meta_keywords)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    COALESCE($11, 'active'), COALESCE($12, 'in_stock'), $13, $14, $15,
                    COALESCE($16, 5), $17, $18)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.brand)
        .bind(category.id)
        .bind(&category.cat_slug)
        .bind(json!(uploaded_images))
        .bind(&secondary_image)
        .bind(&variants_json)
        .bind(json!(specifications))
        .bind(&input.status)
        .bind(&input.availability)
        .bind(coerce_bool(input.featured.as_ref()))
        .bind(&input.material)
        .bind(&input.style)
        .bind(input.low_stock_threshold.as_ref().and_then(integer_field))
        .bind(input.meta_title.as_ref().or(input.seo_title.as_ref()))
        .bind(input.keywords.as_ref().or(input.meta_keywords.as_ref()))
        .fetch_one(pool)
        .await?;
        Ok(product)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        input: &ProductInput,
        uploaded_images: Vec<String>,
    ) -> Result<Product, AppError> {
        let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let existing = existing.ok_or_else(|| AppError::NotFound("Product not found".into()))?;

        let variants_raw = input
            .variants
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Variants must be a non-empty array".into()))?;
        let variants = parse_variants(variants_raw)?;
        let specifications_raw = input.specifications.as_ref().ok_or_else(|| {
            AppError::BadRequest("Specifications must be a non-empty array".into())
        })?;
        let specifications = parse_specifications(specifications_raw)?;

        let mut q = QueryBuf::new();
        let mut sets: Vec<String> = Vec::new();
        fn set(q: &mut QueryBuf, sets: &mut Vec<String>, column: &str, arg: PgArg) {
            let n = q.push(arg);
            sets.push(format!("{column} = ${n}"));
        }

        if let Some(category) = Self::resolve_category(pool, input).await? {
            set(&mut q, &mut sets, "category_id", PgArg::I64(category.id));
            set(&mut q, &mut sets, "cat_slug", PgArg::Text(category.cat_slug));
        }

        if let Some(name) = input.name.as_deref().filter(|n| !n.trim().is_empty()) {
            set(&mut q, &mut sets, "name", PgArg::Text(name.to_string()));
            if name != existing.name {
                let slug = Self::unique_slug(pool, &slugify(name), Some(id)).await?;
                set(&mut q, &mut sets, "slug", PgArg::Text(slug));
            }
        }
        if let Some(description) = &input.description {
            set(&mut q, &mut sets, "description", PgArg::Text(description.clone()));
        }
        if let Some(brand) = &input.brand {
            set(&mut q, &mut sets, "brand", PgArg::Text(brand.clone()));
        }
        if let Some(status) = &input.status {
            set(&mut q, &mut sets, "status", PgArg::Text(status.clone()));
        }
        if let Some(availability) = &input.availability {
            set(&mut q, &mut sets, "availability", PgArg::Text(availability.clone()));
        }
        if let Some(material) = &input.material {
            set(&mut q, &mut sets, "material", PgArg::Text(material.clone()));
        }
        if let Some(style) = &input.style {
            set(&mut q, &mut sets, "style", PgArg::Text(style.clone()));
        }
        if let Some(threshold) = input.low_stock_threshold.as_ref().and_then(integer_field) {
            set(&mut q, &mut sets, "low_stock_threshold", PgArg::I64(threshold));
        }
        if let Some(seo) = input.meta_title.as_ref().or(input.seo_title.as_ref()) {
            set(&mut q, &mut sets, "seo_title", PgArg::Text(seo.clone()));
        }
        if let Some(kw) = input.keywords.as_ref().or(input.meta_keywords.as_ref()) {
            set(&mut q, &mut sets, "meta_keywords", PgArg::Text(kw.clone()));
        }
        if input.featured.is_some() {
            set(&mut q, &mut sets, "featured", PgArg::Bool(coerce_bool(input.featured.as_ref())));
        }

        let variants_json = serde_json::to_value(&variants)
            .map_err(|e| AppError::Internal(format!("variants: {e}")))?;
        set(&mut q, &mut sets, "variants", PgArg::Json(variants_json));
        set(&mut q, &mut sets, "specifications", PgArg::Json(json!(specifications)));

        if !uploaded_images.is_empty() {
            Self::remove_image_files(&existing).await;
            set(&mut q, &mut sets, "images", PgArg::Json(json!(uploaded_images)));
            set(
                &mut q,
                &mut sets,
                "secondary_image",
                uploaded_images
                    .get(1)
                    .map(|s| PgArg::Text(s.clone()))
                    .unwrap_or(PgArg::Null),
            );
        } else if let Some(existing_images) = &input.existing_images {
            let images = json_array("existingImages", existing_images)?;
            set(
                &mut q,
                &mut sets,
                "secondary_image",
                images
                    .get(1)
                    .and_then(Value::as_str)
                    .map(|s| PgArg::Text(s.to_string()))
                    .unwrap_or(PgArg::Null),
            );
            set(&mut q, &mut sets, "images", PgArg::Json(Value::Array(images)));
        }

        sets.push("updated_at = NOW()".into());
        let id_param = q.push(PgArg::I64(id));
        q.sql = format!(
            "UPDATE products SET {} WHERE id = ${id_param} RETURNING *",
            sets.join(", ")
        );
        let product: Product = q.query_as().fetch_one(pool).await?;
        Ok(product)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let existing = existing.ok_or_else(|| AppError::NotFound("Product not found".into()))?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await;
        match result {
            Ok(_) => {
                Self::remove_image_files(&existing).await;
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23503") => Err(
                AppError::BadRequest("Cannot delete product with existing orders".into()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn search(
        pool: &PgPool,
        term: &str,
        limit: u32,
    ) -> Result<Vec<ProductWithCategory>, AppError> {
        let mut q = QueryBuf::new();
        q.any_of(
            &[
                "p.name ILIKE {}",
                "p.description ILIKE {}",
                "p.brand ILIKE {}",
                "p.cat_slug ILIKE {}",
            ],
            PgArg::Text(like_pattern(term)),
        );
        q.raw_condition("p.status = 'active'");
        q.sql = format!(
            "{SELECT_WITH_CATEGORY}{} ORDER BY p.sales_count DESC LIMIT {}",
            q.where_clause(),
            limit.clamp(1, 100)
        );
        Ok(q.query_as().fetch_all(pool).await?)
    }

    pub async fn stats(pool: &PgPool) -> Result<ProductStats, AppError> {
        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await?;
        let active_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE status = 'active'")
                .fetch_one(pool)
                .await?;
        let out_of_stock_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE availability = 'out_of_stock'")
                .fetch_one(pool)
                .await?;
        let featured_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE featured")
                .fetch_one(pool)
                .await?;
        let low_stock_products: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE (SELECT COALESCE(SUM((v->>'quantity')::bigint), 0)
                   FROM jsonb_array_elements(variants) v) <= low_stock_threshold
            "#,
        )
        .fetch_one(pool)
        .await?;

        let top_selling_products: Vec<TopSellingProduct> = sqlx::query_as(
            "SELECT id, name, sales_count, images FROM products ORDER BY sales_count DESC LIMIT 10",
        )
        .fetch_all(pool)
        .await?;
        let products_by_category: Vec<CategoryCount> = sqlx::query_as(
            "SELECT cat_slug, COUNT(*) AS count FROM products GROUP BY cat_slug ORDER BY count DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(ProductStats {
            overview: ProductStatsOverview {
                total_products,
                active_products,
                out_of_stock_products,
                featured_products,
                low_stock_products,
            },
            top_selling_products,
            products_by_category,
        })
    }

    pub async fn export(pool: &PgPool) -> Result<Vec<Product>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM products ORDER BY id")
            .fetch_all(pool)
            .await?)
    }

    /// Upsert products by slug from an exported JSON array.
    pub async fn import(pool: &PgPool, items: &[Value]) -> Result<ImportOutcome, AppError> {
        if items.len() > IMPORT_LIMIT {
            return Err(AppError::BadRequest(format!(
                "import limited to {IMPORT_LIMIT} items"
            )));
        }
        let mut inserted = 0;
        let mut updated = 0;
        let mut tx = pool.begin().await?;
        for item in items {
            let input: ProductInput = serde_json::from_value(item.clone())
                .map_err(|e| AppError::BadRequest(format!("invalid product record: {e}")))?;
            let name = crate::validation::required("name", input.name.as_deref())?;
            let slug = input.slug.clone().unwrap_or_else(|| slugify(&name));
            let variants = input
                .variants
                .as_ref()
                .map(|v| parse_variants(v))
                .transpose()?
                .unwrap_or_default();
            let variants_json = serde_json::to_value(&variants)
                .map_err(|e| AppError::Internal(format!("variants: {e}")))?;
            let specifications = input
                .specifications
                .as_ref()
                .map(|s| parse_specifications(s))
                .transpose()?
                .unwrap_or_default();

            let was_insert: bool = sqlx::query_scalar(
                r#"
                INSERT INTO products (name, slug, description, brand, cat_slug, variants,
                                      specifications, status, availability, featured)
                VALUES ($1, $2, $3, $4, $5, $6, $7,
                        COALESCE($8, 'active'), COALESCE($9, 'in_stock'), $10)
                ON CONFLICT (slug) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    brand = EXCLUDED.brand,
                    cat_slug = EXCLUDED.cat_slug,
                    variants = EXCLUDED.variants,
                    specifications = EXCLUDED.specifications,
                    status = EXCLUDED.status,
                    availability = EXCLUDED.availability,
                    featured = EXCLUDED.featured,
                    updated_at = NOW()
                RETURNING (xmax = 0)
                "#,
            )
            .bind(&name)
            .bind(&slug)
            .bind(&input.description)
            .bind(&input.brand)
            .bind(&input.cat_slug)
            .bind(&variants_json)
            .bind(json!(specifications))
            .bind(&input.status)
            .bind(&input.availability)
            .bind(coerce_bool(input.featured.as_ref()))
            .fetch_one(&mut *tx)
            .await?;
            if was_insert {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
        tx.commit().await?;
        Ok(ImportOutcome { inserted, updated })
    }

    async fn resolve_category(
        pool: &PgPool,
        input: &ProductInput,
    ) -> Result<Option<Category>, AppError> {
        let Some(raw) = input.category_id.as_ref() else {
            return Ok(None);
        };
        let id = integer_field(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid or missing category for categoryId: {raw}"))
        })?;
        let category: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        match category {
            Some(c) => Ok(Some(c)),
            None => Err(AppError::BadRequest(format!(
                "Invalid or missing category for categoryId: {id}"
            ))),
        }
    }

    /// Slug, de-duplicated with a millisecond suffix on collision.
    async fn unique_slug(
        pool: &PgPool,
        candidate: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, AppError> {
        let mut q = QueryBuf::new();
        q.condition("slug = {}", PgArg::Text(candidate.to_string()));
        if let Some(id) = exclude_id {
            q.condition("id <> {}", PgArg::I64(id));
        }
        q.sql = format!("SELECT id FROM products{}", q.where_clause());
        let taken: Option<(i64,)> = q.query_as().fetch_optional(pool).await?;
        if taken.is_none() {
            return Ok(candidate.to_string());
        }
        Ok(format!("{candidate}-{}", Utc::now().timestamp_millis()))
    }

    /// Best-effort removal of stored image files. Paths already carry the
    /// uploads prefix (e.g. `uploads/products/<file>`).
    async fn remove_image_files(product: &Product) {
        let Some(images) = product.images.as_array() else {
            return;
        };
        for path in images.iter().filter_map(Value::as_str) {
            if path.starts_with("http") {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::debug!(path, error = %e, "could not remove image file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_collapses_spaces() {
        assert_eq!(slugify("Silk Saree & Deluxe!"), "silk-saree-deluxe");
        assert_eq!(slugify("  A  B  "), "a-b");
        assert_eq!(slugify("Déjà"), "dj");
    }

    #[test]
    fn variants_accept_json_encoded_strings() {
        let raw = Value::String(
            r#"[{"color":"Red","size":"M","type":"standard","price":"99.5","quantity":"3"}]"#
                .into(),
        );
        let parsed = parse_variants(&raw).unwrap();
        assert_eq!(parsed[0].price, 99.5);
        assert_eq!(parsed[0].quantity, 3);
    }

    #[test]
    fn variants_reject_missing_fields_and_negatives() {
        let missing = json!([{ "color": "Red", "price": 10 }]);
        assert!(parse_variants(&missing).is_err());
        let negative =
            json!([{ "color": "Red", "size": "M", "type": "t", "price": 10, "quantity": -1 }]);
        assert!(parse_variants(&negative).is_err());
        assert!(parse_variants(&json!([])).is_err());
    }

    #[test]
    fn specifications_map_value_to_fabric() {
        let raw = json!([{ "value": "Cotton" }, { "Fabric": "Silk" }]);
        let parsed = parse_specifications(&raw).unwrap();
        assert_eq!(parsed[0], json!({ "Fabric": "Cotton" }));
        assert_eq!(parsed[1], json!({ "Fabric": "Silk" }));
        assert!(parse_specifications(&json!([{ "value": "" }])).is_err());
    }

    #[test]
    fn featured_coerces_from_strings() {
        assert!(coerce_bool(Some(&json!("true"))));
        assert!(coerce_bool(Some(&json!(true))));
        assert!(!coerce_bool(Some(&json!("false"))));
        assert!(!coerce_bool(None));
    }

    #[test]
    fn absolutize_leaves_full_urls_alone() {
        assert_eq!(
            absolutize("uploads/products/a.jpg", "http://localhost:5000"),
            "http://localhost:5000/uploads/products/a.jpg"
        );
        assert_eq!(
            absolutize("https://cdn.example.com/a.jpg", "http://localhost:5000"),
            "https://cdn.example.com/a.jpg"
        );
    }
}
