//! Route handlers: extract, validate, call the service, shape the JSON.

pub mod addresses;
pub mod auth;
pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;
pub mod uploads;

use crate::config::AppConfig;
use axum::http::{header::HOST, HeaderMap};

/// Base URL for absolutizing stored image paths, from the request's Host
/// header unless a public URL is configured.
pub fn request_base_url(headers: &HeaderMap, config: &AppConfig) -> String {
    if let Some(url) = &config.public_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{proto}://{host}")
}
