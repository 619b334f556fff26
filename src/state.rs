//! Shared application state for all routes.

use crate::config::AppConfig;
use crate::mailer::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<Mailer>,
}
