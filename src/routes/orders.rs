//! Order routes; all require a valid token.

use crate::handlers::orders::{cancel, create, get, list, stats, update_status};
use crate::state::AppState;
use axum::{
    routing::{get as get_route, patch, post},
    Router,
};

pub fn order_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/stats", get_route(stats))
        .route("/:id", get_route(get))
        .route("/:id/status", patch(update_status))
        .route("/:id/cancel", post(cancel))
        .with_state(state)
}
