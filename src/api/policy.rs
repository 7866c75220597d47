//! Access policy: who may touch which resource.
//!
//! Tasks are private to their owner. Admins get no blanket access to task
//! resources; admin privilege is scoped to the `/admin/*` surface only.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use super::error::ApiError;
use super::token::{bearer_token, Claims};
use crate::AppState;

/// Owner check: a resource is accessible iff the verified claims belong to
/// its owner. The todo handlers enforce this same rule through the owner
/// predicate in their SQL lookups (`WHERE id = ? AND user_id = ?`), so a
/// single query covers both existence and ownership; this function states
/// the rule on its own for callers that already hold a loaded resource.
pub fn can_access_resource(claims: &Claims, resource_owner_id: &str) -> bool {
    claims.user_id == resource_owner_id
}

/// True iff claims are present and carry the admin role
pub fn require_admin(claims: Option<&Claims>) -> bool {
    claims.map(|c| c.is_admin()).unwrap_or(false)
}

/// Extractor for routes that require an authenticated caller. Absent,
/// malformed, tampered and expired tokens all reject with the same 401.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .and_then(|token| state.tokens.verify(token))
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Extractor for `/admin/*` routes. These reject with 403 for both missing
/// credentials and authenticated non-admins, unlike the rest of the
/// protected surface which answers 401 for missing auth. Kept as observed
/// in production rather than unified.
pub struct AdminClaims(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(&parts.headers).and_then(|token| state.tokens.verify(token));
        match claims {
            Some(claims) if require_admin(Some(&claims)) => Ok(AdminClaims(claims)),
            _ => Err(ApiError::forbidden(
                "Access denied. Administrator privileges required.",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: &str, role: &str) -> Claims {
        Claims {
            user_id: user_id.to_string(),
            email: format!("{}@test.com", user_id),
            role: role.to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_owner_can_access_own_resource() {
        assert!(can_access_resource(&claims("u1", "user"), "u1"));
    }

    #[test]
    fn test_non_owner_cannot_access() {
        assert!(!can_access_resource(&claims("u1", "user"), "u2"));
    }

    #[test]
    fn test_admin_gets_no_blanket_resource_access() {
        assert!(!can_access_resource(&claims("admin1", "admin"), "u2"));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(Some(&claims("a", "admin"))));
        assert!(!require_admin(Some(&claims("u", "user"))));
        assert!(!require_admin(None));
    }
}
