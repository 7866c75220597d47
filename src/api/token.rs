//! Signed bearer token issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying the user's identity and role plus
//! an expiry claim. Verification is stateless: signature and expiry are the
//! only inputs, and every failure mode (malformed token, bad signature,
//! expired claim) is collapsed into `None` so callers cannot distinguish why
//! authentication failed.

use anyhow::{bail, Context, Result};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Identity payload embedded in every token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == crate::db::ROLE_ADMIN
    }
}

/// A freshly issued token together with its expiry instant
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is invalid strictly after its exp instant
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Build the service from configuration. A missing signing secret is
    /// fatal at startup, never a per-request condition.
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        if auth.jwt_secret.trim().is_empty() {
            bail!("No signing secret configured");
        }
        Ok(Self::new(&auth.jwt_secret, Duration::days(auth.token_ttl_days)))
    }

    /// Issue a signed token for a user
    pub fn issue(&self, user_id: &str, email: &str, role: &str) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .context("Failed to encode token")?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token's signature and expiry. Returns `None` on any failure.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Extract the bearer token from the Authorization header. Only the
/// `Bearer <token>` form is accepted; empty or whitespace-only tokens are
/// treated the same as an absent header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::days(7))
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let svc = service();
        let issued = svc.issue("u-1", "a@test.com", "user").unwrap();
        let claims = svc.verify(&issued.token).expect("valid token");
        assert_eq!(claims.user_id, "u-1");
        assert_eq!(claims.email, "a@test.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = TokenService::new("test-secret", Duration::seconds(-5));
        let issued = svc.issue("u-1", "a@test.com", "user").unwrap();
        assert!(svc.verify(&issued.token).is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = service().issue("u-1", "a@test.com", "user").unwrap();
        let other = TokenService::new("different-secret", Duration::days(7));
        assert!(other.verify(&issued.token).is_none());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let svc = service();
        assert!(svc.verify("").is_none());
        assert!(svc.verify("not.a.jwt").is_none());
        assert!(svc.verify("garbage").is_none());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let issued = svc.issue("u-1", "a@test.com", "user").unwrap();
        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(svc.verify(&tampered).is_none());
    }

    #[test]
    fn test_from_config_requires_secret() {
        let auth = AuthConfig::default();
        assert!(TokenService::from_config(&auth).is_err());

        let auth = AuthConfig {
            jwt_secret: "s3cret".to_string(),
            ..AuthConfig::default()
        };
        assert!(TokenService::from_config(&auth).is_ok());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        // No Bearer prefix
        headers.insert("Authorization", HeaderValue::from_static("abc123"));
        assert!(bearer_token(&headers).is_none());

        // Empty and whitespace-only tokens are invalid
        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());
        headers.insert("Authorization", HeaderValue::from_static("Bearer    "));
        assert!(bearer_token(&headers).is_none());
    }
}
