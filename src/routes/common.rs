//! Liveness banner, health check with database ping, and the API
//! self-check endpoint.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "message": "Server is running" }))
}

async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthBody>, (StatusCode, Json<HealthBody>)> {
    if sqlx::query("SELECT 1")
        .fetch_optional(&state.pool)
        .await
        .is_err()
    {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthBody {
                status: "degraded",
                database: Some("unavailable"),
            }),
        ));
    }
    Ok(Json(HealthBody {
        status: "ok",
        database: Some("ok"),
    }))
}

async fn test() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Order API is working",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/test", get(test))
        .with_state(state)
}
