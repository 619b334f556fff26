//! HS256 access tokens. Claims carry the account id and whether it is a
//! user or admin token.

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetimes match the original backend: password logins get a week,
/// admin sessions two, Google sign-ins sixteen days.
pub const USER_TOKEN_DAYS: i64 = 7;
pub const ADMIN_TOKEN_DAYS: i64 = 14;
pub const GOOGLE_TOKEN_DAYS: i64 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    User,
    Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
}

pub fn sign(secret: &str, id: i64, kind: TokenKind, valid_days: i64) -> Result<String, AppError> {
    let claims = Claims {
        id,
        kind,
        exp: (Utc::now() + Duration::days(valid_days)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("jwt sign: {e}")))
}

pub fn verify(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token has expired. Please log in again.".into())
        }
        _ => AppError::Unauthorized("Invalid token format.".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let token = sign("secret", 42, TokenKind::Admin, 1).unwrap();
        let claims = verify("secret", &token).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.kind, TokenKind::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign("secret", 1, TokenKind::User, 1).unwrap();
        assert!(verify("other", &token).is_err());
    }

    #[test]
    fn expired_token_reports_expiry() {
        let token = sign("secret", 1, TokenKind::User, -1).unwrap();
        let err = verify("secret", &token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn claims_type_field_serializes_lowercase() {
        let claims = Claims {
            id: 7,
            kind: TokenKind::User,
            exp: 0,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "user");
    }
}
