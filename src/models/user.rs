//! Storefront user accounts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub join_date: Option<NaiveDate>,
    /// `email` for password/OTP accounts, `google` for OAuth accounts.
    pub provider: String,
    pub is_verified: bool,
    pub status: String,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires: Option<DateTime<Utc>>,
    pub total_orders: i32,
    pub total_spent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The shape `/api/auth` returns for user accounts.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub join_date: Option<NaiveDate>,
    pub avatar: String,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub profile_complete: bool,
}

impl User {
    /// A profile is complete once the user has filled in name and phone.
    pub fn profile_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.name) && filled(&self.phone)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            join_date: self.join_date,
            avatar: self.avatar.clone().unwrap_or_default(),
            role: self.role.clone(),
            kind: "user",
            profile_complete: self.profile_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: Option<&str>, phone: Option<&str>) -> User {
        User {
            id: 1,
            email: "a@b.in".into(),
            password: None,
            name: name.map(String::from),
            phone: phone.map(String::from),
            role: "user".into(),
            avatar: None,
            join_date: None,
            provider: "email".into(),
            is_verified: false,
            status: "Active".into(),
            otp: None,
            otp_expires: None,
            total_orders: 0,
            total_spent: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn profile_complete_needs_name_and_phone() {
        assert!(!user(None, None).profile_complete());
        assert!(!user(Some("Asha"), Some("  ")).profile_complete());
        assert!(user(Some("Asha"), Some("9876543210")).profile_complete());
    }
}
