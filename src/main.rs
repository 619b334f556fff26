//! Server binary: env config, database bootstrap, router, layers, serve.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, Uri};
use axum::routing::any;
use axum::Json;
use nyraa_api::mailer::Mailer;
use nyraa_api::{api_router, apply_migrations, ensure_database_exists, seed_default_admin,
    AppConfig, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const BODY_LIMIT: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nyraa_api=info".parse()?))
        .init();

    let config = AppConfig::load();

    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    apply_migrations(&pool).await?;
    seed_default_admin(&pool).await?;

    for dir in ["products", "avatars"] {
        tokio::fs::create_dir_all(format!("{}/{dir}", config.uploads_dir)).await?;
    }

    let cors = cors_layer(&config);
    let uploads = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ))
        .service(ServeDir::new(&config.uploads_dir).not_found_service(any(missing_upload)));

    let port = config.port;
    let state = AppState {
        pool,
        mailer: Arc::new(Mailer::from_config(&config)),
        config: Arc::new(config),
    };

    let app = api_router(state)
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
                .layer(cors)
                .layer(DefaultBodyLimit::max(BODY_LIMIT)),
        );

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn missing_upload(uri: Uri) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "message": "Image not found",
            "path": uri.path(),
        })),
    )
}

async fn not_found(method: Method, uri: Uri) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "message": format!("Route not found: {method} {}", uri.path()),
        })),
    )
}
