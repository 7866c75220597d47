//! Registration, login, token verification and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AuthResponse, ClientMeta, LoginRequest, RegisterRequest, Session, User, UserResponse,
    ROLE_USER,
};
use crate::AppState;

use super::error::ApiError;
use super::token::bearer_token;
use super::validation::{validate_email, validate_name, validate_password};

/// Hash a password using Argon2. The digest is a self-describing PHC string
/// embedding the salt and cost parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored digest. Malformed digests verify as
/// false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Client metadata for the session ledger: User-Agent plus the first
/// X-Forwarded-For hop.
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());
    ClientMeta {
        user_agent,
        ip_address,
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: UserResponse,
}

/// Register a new user
///
/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (email, password, name) = match (request.email, request.password, request.name) {
        (Some(email), Some(password), Some(name))
            if !email.is_empty() && !password.is_empty() && !name.is_empty() =>
        {
            (email, password, name)
        }
        _ => {
            return Err(ApiError::bad_request(
                "All fields are required (email, password, name)",
            ))
        }
    };

    validate_email(&email).map_err(ApiError::bad_request)?;
    validate_password(&password).map_err(ApiError::bad_request)?;
    validate_name(&name).map_err(ApiError::bad_request)?;

    let email = email.to_lowercase();
    let name = name.trim().to_string();

    // Pre-check for a friendly message; the unique constraint still backs
    // this up under concurrent registration (race surfaces as 409 via the
    // sqlx error translation)
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Internal server error")
    })?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, is_active, created_at, last_login, updated_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .bind(ROLE_USER)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    let issued = state.tokens.issue(&user.id, &user.email, &user.role).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue token");
        ApiError::internal("Internal server error")
    })?;

    Session::record(
        &state.db,
        &user.id,
        &issued.token,
        &issued.expires_at.to_rfc3339(),
        &client_meta(&headers),
    )
    .await?;

    tracing::info!(user_id = %user.id, "Registered new user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(user),
            token: issued.token,
        }),
    ))
}

/// Authenticate a user and issue a token
///
/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, password) = match (request.email, request.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(ApiError::bad_request("Email and password are required")),
    };

    validate_email(&email).map_err(ApiError::bad_request)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email.to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    // Same message for unknown email and wrong password, so login attempts
    // cannot enumerate accounts
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(ApiError::forbidden(
            "Account is deactivated. Contact an administrator",
        ));
    }

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(&now)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    let issued = state.tokens.issue(&user.id, &user.email, &user.role).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue token");
        ApiError::internal("Internal server error")
    })?;

    Session::record(
        &state.db,
        &user.id,
        &issued.token,
        &issued.expires_at.to_rfc3339(),
        &client_meta(&headers),
    )
    .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let mut user = user;
    user.last_login = Some(now);

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token: issued.token,
    }))
}

/// Verify the presented token and return fresh user data
///
/// GET /auth/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, ApiError> {
    let claims = bearer_token(&headers)
        .and_then(|token| state.tokens.verify(token))
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&claims.user_id)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    Ok(Json(VerifyResponse {
        user: UserResponse::from(user),
    }))
}

/// Close the session for the presented token
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = bearer_token(&headers)
        .filter(|token| state.tokens.verify(token).is_some())
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    // Deletes the bookkeeping row; the signed token itself stays valid
    // until its natural expiry
    Session::revoke(&state.db, token).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("Test1234").unwrap();
        assert!(verify_password("Test1234", &hash));
        assert!(!verify_password("WrongPass1", &hash));
    }

    #[test]
    fn test_digest_is_self_describing() {
        // PHC string embeds algorithm, salt and cost parameters
        let hash = hash_password("Test1234").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Test1234").unwrap();
        let b = hash_password("Test1234").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_digest_verifies_false() {
        assert!(!verify_password("Test1234", "not-a-phc-string"));
        assert!(!verify_password("Test1234", ""));
    }

    #[test]
    fn test_client_meta_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "test-agent/1.0".parse().unwrap());
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1".parse().unwrap(),
        );
        let meta = client_meta(&headers);
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
    }
}
