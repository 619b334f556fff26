//! Application configuration from environment variables.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// Frontend origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Google OAuth client id; Google login is rejected when unset.
    pub google_client_id: Option<String>,
    pub smtp: Option<SmtpConfig>,
    /// Directory for uploaded product images and avatars.
    pub uploads_dir: String,
    /// Public base URL used to absolutize image paths when the request
    /// host is not available (e.g. background contexts).
    pub public_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl AppConfig {
    /// Load from env. `JWT_SECRET` and `DATABASE_URL` have development
    /// defaults; everything secret should be set in production.
    pub fn load() -> Self {
        let smtp = match (env::var("EMAIL_USER"), env::var("EMAIL_PASS")) {
            (Ok(username), Ok(password)) => Some(SmtpConfig {
                host: try_load("SMTP_HOST", "smtp.gmail.com"),
                port: try_load("SMTP_PORT", "587"),
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| username.clone()),
                username,
                password,
            }),
            _ => {
                info!("EMAIL_USER/EMAIL_PASS not set; OTP emails will be logged instead");
                None
            }
        };

        Self {
            port: try_load("PORT", "5000"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/nyraa".into()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                info!("JWT_SECRET not set, using development default");
                "your-default-secret-key".into()
            }),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| {
                    "http://localhost:5173,http://localhost:5174,http://localhost:3000".into()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            smtp,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".into()),
            public_url: env::var("PUBLIC_URL").ok().filter(|s| !s.is_empty()),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().unwrap_or_else(|e| {
        panic!("invalid {key} value {raw:?}: {e}");
    })
}
