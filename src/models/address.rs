//! Saved shipping/billing addresses. At most one default per user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub const ADDRESS_TYPES: [&str; 3] = ["home", "work", "other"];

#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
