//! Authentication routes. Profile routes authenticate via extractors.

use crate::handlers::auth::{
    admin_login, change_password, get_profile, google_login, login, send_otp, update_profile,
    upload_avatar, user_login, verify_otp,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/admin/login", post(admin_login))
        .route("/user/login", post(user_login))
        .route("/login", post(login))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/google", post(google_login))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route("/upload-avatar", post(upload_avatar))
        .with_state(state)
}
