//! Admin-managed customer records (CRM side of the admin panel).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

pub const CUSTOMER_STATUSES: [&str; 3] = ["Active", "Inactive", "Blocked"];

#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub addresses: Option<Value>,
    pub preferences: Option<Value>,
    pub referral_code: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub total_orders: i32,
    pub total_spent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact order projection embedded in customer responses.
#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub total: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWithOrders {
    #[serde(flatten)]
    pub customer: Customer,
    pub orders: Vec<OrderSummary>,
}
