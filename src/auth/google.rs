//! Google sign-in: verify an ID token against Google's tokeninfo endpoint
//! and check it was minted for our client id.

use crate::error::AppError;
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Fields of Google's tokeninfo response we act on.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenInfo {
    /// Client id the token was issued to.
    pub aud: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Google returns this as the string "true"/"false".
    #[serde(default)]
    pub email_verified: Option<String>,
}

/// Identity extracted from a verified Google ID token.
#[derive(Clone, Debug, PartialEq)]
pub struct GoogleUser {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
}

impl GoogleVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }

    /// Verify `id_token` and return the Google identity. Any failure maps
    /// to 401, as the original treated every Google error the same way.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleUser, AppError> {
        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "tokeninfo request failed");
                AppError::Unauthorized("Google authentication failed".into())
            })?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized(
                "Google authentication failed".into(),
            ));
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "tokeninfo response malformed");
            AppError::Unauthorized("Google authentication failed".into())
        })?;

        accept_token_info(info, &self.client_id)
    }
}

/// The token must target our client id; an unverified email is refused.
fn accept_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleUser, AppError> {
    if info.aud != client_id {
        return Err(AppError::Unauthorized(
            "Google authentication failed".into(),
        ));
    }
    if info.email_verified.as_deref() == Some("false") {
        return Err(AppError::Unauthorized(
            "Google authentication failed".into(),
        ));
    }
    Ok(GoogleUser {
        email: info.email,
        name: info.name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            email: "who@example.com".into(),
            name: Some("Who".into()),
            picture: None,
            email_verified: verified.map(String::from),
        }
    }

    #[test]
    fn audience_mismatch_is_rejected() {
        assert!(accept_token_info(info("other-client", None), "our-client").is_err());
    }

    #[test]
    fn unverified_email_is_rejected() {
        assert!(accept_token_info(info("our-client", Some("false")), "our-client").is_err());
    }

    #[test]
    fn matching_audience_passes_identity_through() {
        let user = accept_token_info(info("our-client", Some("true")), "our-client").unwrap();
        assert_eq!(user.email, "who@example.com");
        assert_eq!(user.name.as_deref(), Some("Who"));
    }
}
