//! Request extractors: JWT verification plus account loading, and the
//! admin-role gate.

use crate::auth::jwt::{self, TokenKind};
use crate::error::AppError;
use crate::models::{Admin, User};
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

#[derive(Clone, Debug)]
pub enum Account {
    User(User),
    Admin(Admin),
}

/// Authenticated caller: verified claims plus the freshly loaded account
/// row, so handlers can read profile fields without another query.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub kind: TokenKind,
    pub account: Account,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        match &self.account {
            Account::User(u) => u.id,
            Account::Admin(a) => a.id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.account, Account::Admin(_))
    }

    /// Best display name for audit trails: name, then email/username.
    pub fn display_name(&self) -> String {
        match &self.account {
            Account::User(u) => u
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| u.email.clone()),
            Account::Admin(a) => a
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| a.username.clone()),
        }
    }
}

/// The original middleware accepted both `Bearer <token>` and a bare token.
fn token_from_header(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(token_from_header)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".into()))?;

        let claims = jwt::verify(&state.config.jwt_secret, header)?;

        let account = match claims.kind {
            TokenKind::Admin => {
                let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE id = $1")
                    .bind(claims.id)
                    .fetch_optional(&state.pool)
                    .await?;
                Account::Admin(admin.ok_or_else(|| {
                    AppError::Unauthorized("Token verification failed.".into())
                })?)
            }
            TokenKind::User => {
                let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
                    .bind(claims.id)
                    .fetch_optional(&state.pool)
                    .await?;
                Account::User(user.ok_or_else(|| {
                    AppError::Unauthorized("Token verification failed.".into())
                })?)
            }
        };

        Ok(AuthUser {
            kind: claims.kind,
            account,
        })
    }
}

/// Admin-only gate: rejects user tokens with 403.
#[derive(Clone, Debug)]
pub struct AdminUser(pub Admin);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        match auth.account {
            Account::Admin(admin) => Ok(AdminUser(admin)),
            Account::User(_) => Err(AppError::Forbidden("Admin access required".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(token_from_header("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(token_from_header("abc.def.ghi"), "abc.def.ghi");
    }
}
