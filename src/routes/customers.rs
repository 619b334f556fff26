//! Customer CRM routes; every handler requires an admin token.

use crate::handlers::customers::{create, delete, get, list, stats, update};
use crate::state::AppState;
use axum::{routing::get as get_route, Router};

pub fn customer_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get_route(list).post(create))
        .route("/stats", get_route(stats))
        .route("/:id", get_route(get).put(update).delete(delete))
        .with_state(state)
}
