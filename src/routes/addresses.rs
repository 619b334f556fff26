//! Address book routes, mounted under /api/addresses.

use crate::handlers::addresses::{create, delete, get, get_default, list, set_default, update};
use crate::state::AppState;
use axum::{
    routing::{get as get_route, put},
    Router,
};

pub fn address_routes(state: AppState) -> Router {
    Router::new()
        .route("/user/addresses", get_route(list).post(create))
        .route("/user/addresses/default", get_route(get_default))
        .route(
            "/user/addresses/:id",
            get_route(get).put(update).delete(delete),
        )
        .route("/user/addresses/:id/default", put(set_default))
        .with_state(state)
}
