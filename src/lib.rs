//! Nyraa API: REST backend for the storefront and admin panel.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod sql;
pub mod state;
pub mod validation;

pub use config::AppConfig;
pub use error::AppError;
pub use migration::{apply_migrations, ensure_database_exists, seed_default_admin};
pub use response::{pagination, Envelope, Pagination};
pub use routes::api_router;
pub use state::AppState;
