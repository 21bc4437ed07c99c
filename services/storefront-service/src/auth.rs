// =============================================================================
// AUTH MODULE
// =============================================================================
// Admin authentication:
// - Argon2 password hashes stored as PHC strings
// - HS256 session tokens signed with the configured shared secret
// - `AuthAdmin` extractor guarding the admin routes
//
// Missing token  -> 401 Unauthorized
// Invalid token  -> 403 Forbidden
// =============================================================================

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Admin, AdminRole};
use crate::AppState;

// =============================================================================
// PASSWORD HASHING
// =============================================================================

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// A malformed stored hash verifies as `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin record ID
    pub sub: String,
    pub username: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, admin: &Admin) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: admin.id.clone(),
            username: admin.username.clone(),
            role: admin.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected admin token");
                AppError::Forbidden("Invalid token".to_string())
            })
    }
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Claims of the authenticated admin. Adding this to a handler's arguments
/// makes the route admin-only.
#[derive(Debug, Clone)]
pub struct AuthAdmin(pub Claims);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;
        state.tokens.verify(token).map(AuthAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn admin() -> Admin {
        Admin {
            id: "a1".into(),
            username: "admin".into(),
            password: String::new(),
            email: "admin@example.com".into(),
            role: AdminRole::SuperAdmin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "admin123");
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        assert_ne!(hash_password("secret").unwrap(), hash_password("secret").unwrap());
    }

    #[test]
    fn test_hash_embeds_full_length_salt() {
        let hash = hash_password("secret").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        // 16 salt bytes encode to 22 unpadded base64 characters
        assert_eq!(parsed.salt.map(|s| s.as_str().len()), Some(22));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("admin123", "admin123"));
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new("test-secret", chrono::Duration::hours(1));
        let claims = tokens.verify(&tokens.issue(&admin()).unwrap()).unwrap();
        assert_eq!(claims.sub, "a1");
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, AdminRole::SuperAdmin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let issuer = TokenService::new("one", chrono::Duration::hours(1));
        let verifier = TokenService::new("two", chrono::Duration::hours(1));
        let token = issuer.issue(&admin()).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::Forbidden(_))));
        assert!(matches!(verifier.verify("garbage"), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("s", chrono::Duration::hours(-1));
        let token = tokens.issue(&admin()).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let (parts, _) = Request::builder()
            .header(AUTHORIZATION, "Bearer abc.def")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def"));

        let (parts, _) = Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), None);

        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
