//! Admin accounts for the admin panel.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The shape `/api/auth` returns for admin accounts.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub avatar: String,
    pub phone: String,
    pub department: String,
    pub join_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Admin {
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone().unwrap_or_default(),
            role: self.role.clone(),
            avatar: self.avatar.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            department: self.department.clone().unwrap_or_default(),
            join_date: self.join_date,
            kind: "admin",
        }
    }
}
