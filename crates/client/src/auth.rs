//! Claim extraction from identity-provider tokens.
//!
//! Tokens are issued and verified by the identity provider and the API
//! gateway; the client only reads claims to fill in session details such
//! as the user's email. Signatures are therefore not checked here.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use groupbuy_core::types::Timestamp;

/// Claims the client cares about. Everything else in the token is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserClaims {
    /// Identity-provider subject id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "cognito:username")]
    pub username: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    #[serde(default)]
    pub exp: Option<i64>,
}

impl UserClaims {
    /// Whether `exp` is present and not after `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.exp.is_some_and(|exp| exp <= now.timestamp())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Malformed token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// Read the claims of a JWT without verifying its signature.
pub fn read_claims(token: &str) -> Result<UserClaims, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<UserClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Email claim of a token, if the token is readable and carries one.
pub fn email_from_token(token: &str) -> Option<String> {
    match read_claims(token) {
        Ok(claims) => claims.email.filter(|e| !e.is_empty()),
        Err(e) => {
            tracing::debug!(error = %e, "Could not read token claims");
            None
        }
    }
}
