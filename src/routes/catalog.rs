//! Catalog routes: products (public reads, admin writes, JSON
//! import/export) and categories.

use crate::handlers::{categories, products};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn catalog_routes(state: AppState) -> Router {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route("/products/search", get(products::search))
        .route("/products/stats", get(products::stats))
        .route("/products/export", get(products::export))
        .route("/products/import", post(products::import))
        .route(
            "/products/:id",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/:id",
            put(categories::update).delete(categories::delete),
        )
        .with_state(state)
}
