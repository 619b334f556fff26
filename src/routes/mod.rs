//! Router assembly, mirroring the original server's mount points.

pub mod addresses;
pub mod auth;
pub mod catalog;
pub mod common;
pub mod customers;
pub mod orders;

use crate::state::AppState;
use axum::Router;

/// The full API surface. Layers (CORS, tracing, body limits, static
/// uploads) are applied by the binary.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(common::common_routes(state.clone()))
        .nest("/api/auth", auth::auth_routes(state.clone()))
        .nest("/api", catalog::catalog_routes(state.clone()))
        .nest("/api/orders", orders::order_routes(state.clone()))
        .nest("/api/addresses", addresses::address_routes(state.clone()))
        .nest("/api/customers", customers::customer_routes(state))
}
