//! Database bootstrap: idempotent DDL for all tables and indexes, plus the
//! default admin seed. Runs at startup, the way the original synced its
//! schema before listening.

use crate::error::AppError;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(100) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        password VARCHAR(255) NOT NULL,
        name VARCHAR(255),
        role VARCHAR(50) NOT NULL DEFAULT 'Administrator',
        avatar VARCHAR(500),
        phone VARCHAR(20),
        department VARCHAR(100),
        join_date DATE,
        last_login TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        password VARCHAR(255),
        name VARCHAR(255),
        phone VARCHAR(20),
        role VARCHAR(50) NOT NULL DEFAULT 'user',
        avatar VARCHAR(500),
        join_date DATE,
        provider VARCHAR(20) NOT NULL DEFAULT 'email',
        is_verified BOOLEAN NOT NULL DEFAULT FALSE,
        status VARCHAR(20) NOT NULL DEFAULT 'Active',
        otp VARCHAR(6),
        otp_expires TIMESTAMPTZ,
        total_orders INTEGER NOT NULL DEFAULT 0,
        total_spent DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        category VARCHAR(255) NOT NULL,
        cat_slug VARCHAR(255) NOT NULL UNIQUE,
        description TEXT,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        slug VARCHAR(255) NOT NULL UNIQUE,
        description TEXT,
        brand VARCHAR(255),
        category_id BIGINT REFERENCES categories(id),
        cat_slug VARCHAR(255),
        images JSONB NOT NULL DEFAULT '[]',
        secondary_image VARCHAR(500),
        variants JSONB NOT NULL DEFAULT '[]',
        specifications JSONB NOT NULL DEFAULT '[]',
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        availability VARCHAR(20) NOT NULL DEFAULT 'in_stock',
        featured BOOLEAN NOT NULL DEFAULT FALSE,
        material VARCHAR(100),
        style VARCHAR(100),
        view_count BIGINT NOT NULL DEFAULT 0,
        sales_count BIGINT NOT NULL DEFAULT 0,
        low_stock_threshold INTEGER NOT NULL DEFAULT 5,
        seo_title VARCHAR(255),
        meta_keywords TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        order_number VARCHAR(50) NOT NULL UNIQUE,
        user_id BIGINT NOT NULL REFERENCES users(id),
        status VARCHAR(20) NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'confirmed', 'processing', 'shipped', 'delivered', 'cancelled', 'refunded')),
        payment_status VARCHAR(20) NOT NULL DEFAULT 'pending'
            CHECK (payment_status IN ('pending', 'paid', 'failed', 'refunded')),
        payment_method VARCHAR(20) NOT NULL DEFAULT 'creditCard'
            CHECK (payment_method IN ('creditCard', 'debitCard', 'paypal', 'cashOnDelivery')),
        subtotal DOUBLE PRECISION NOT NULL DEFAULT 0,
        shipping DOUBLE PRECISION NOT NULL DEFAULT 0,
        tax DOUBLE PRECISION NOT NULL DEFAULT 0,
        discount DOUBLE PRECISION NOT NULL DEFAULT 0,
        total DOUBLE PRECISION NOT NULL DEFAULT 0,
        currency VARCHAR(3) NOT NULL DEFAULT 'INR',
        shipping_address JSONB NOT NULL,
        billing_address JSONB,
        special_instructions TEXT,
        coupon_code VARCHAR(50),
        tracking_number VARCHAR(100),
        estimated_delivery TIMESTAMPTZ,
        delivered_at TIMESTAMPTZ,
        cancelled_at TIMESTAMPTZ,
        refunded_at TIMESTAMPTZ,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id),
        product_id BIGINT NOT NULL REFERENCES products(id),
        product_name VARCHAR(255) NOT NULL,
        product_image VARCHAR(500),
        variant JSONB,
        quantity INTEGER NOT NULL DEFAULT 1,
        unit_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        total_price DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_status_history (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id),
        status VARCHAR(20) NOT NULL
            CHECK (status IN ('pending', 'confirmed', 'processing', 'shipped', 'delivered', 'cancelled', 'refunded')),
        comment TEXT,
        changed_by VARCHAR(255),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS addresses (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        name VARCHAR(255) NOT NULL,
        street TEXT NOT NULL,
        city VARCHAR(100) NOT NULL,
        state VARCHAR(100) NOT NULL,
        zip VARCHAR(20) NOT NULL,
        country VARCHAR(100) NOT NULL DEFAULT 'United States',
        phone VARCHAR(20) NOT NULL,
        "type" VARCHAR(10) NOT NULL DEFAULT 'home' CHECK ("type" IN ('home', 'work', 'other')),
        is_default BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL UNIQUE,
        phone VARCHAR(20),
        date_of_birth DATE,
        gender VARCHAR(20),
        addresses JSONB,
        preferences JSONB,
        referral_code VARCHAR(20),
        notes TEXT,
        status VARCHAR(20) NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Inactive', 'Blocked')),
        total_orders INTEGER NOT NULL DEFAULT 0,
        total_spent DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_products_category_id ON products (category_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_status ON products (status)",
    "CREATE INDEX IF NOT EXISTS idx_products_sales_count ON products (sales_count)",
    "CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_payment_status ON orders (payment_status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_product_id ON order_items (product_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_status_history_order_id ON order_status_history (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_status_history_status ON order_status_history (status)",
    "CREATE INDEX IF NOT EXISTS idx_order_status_history_created_at ON order_status_history (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_addresses_user_id ON addresses (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_addresses_user_default ON addresses (user_id, is_default)",
    "CREATE INDEX IF NOT EXISTS idx_addresses_type ON addresses (\"type\")",
];

/// Create all tables and indexes if they do not exist.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects
/// to the default `postgres` database to run CREATE DATABASE. Call before
/// creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {e}")))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await
            .map_err(AppError::Db)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

/// Create the default admin account when none exists, as the original
/// server did on startup.
pub async fn seed_default_admin(pool: &PgPool) -> Result<(), AppError> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM admins WHERE email = $1")
        .bind("admin@nyraa.com")
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }
    let hash = bcrypt::hash("admin123", 10)
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))?;
    sqlx::query(
        r#"
        INSERT INTO admins (username, email, password, name, phone, department, avatar, join_date, role)
        VALUES ($1, $2, $3, $4, $5, $6, '', CURRENT_DATE, $7)
        "#,
    )
    .bind("admin")
    .bind("admin@nyraa.com")
    .bind(&hash)
    .bind("Administrator")
    .bind("+91 98765 43210")
    .bind("Administration")
    .bind("Administrator")
    .execute(pool)
    .await?;
    tracing::info!("default admin user created");
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{base}postgres");
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_name_is_parsed_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://localhost:5432/nyraa").unwrap();
        assert_eq!(admin, "postgres://localhost:5432/postgres");
        assert_eq!(name, "nyraa");
    }

    #[test]
    fn query_string_is_stripped_from_db_name() {
        let (_, name) =
            parse_db_name_from_url("postgres://u:p@host/nyraa?sslmode=require").unwrap();
        assert_eq!(name, "nyraa");
    }
}
