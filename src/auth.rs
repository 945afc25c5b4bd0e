use crate::config::Config;
use crate::models::{TokenPair, User};
use crate::{AppError, AppState, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: String,
    email: String,
    iat: u64,
    exp: u64,
    jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a Config) -> &'a [u8] {
        match self {
            TokenKind::Access => config.jwt_secret.as_bytes(),
            TokenKind::Refresh => config.jwt_refresh_secret.as_bytes(),
        }
    }

    fn lifetime_secs(&self, config: &Config) -> u64 {
        match self {
            TokenKind::Access => config.access_token_expiry_seconds,
            TokenKind::Refresh => config.refresh_token_expiry_seconds,
        }
    }
}

pub fn issue_token(config: &Config, kind: TokenKind, payload: &TokenPayload) -> Result<String> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        user_id: payload.user_id.clone(),
        email: payload.email.clone(),
        iat: now,
        exp: now + kind.lifetime_secs(config),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(kind.secret(config)),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

pub fn generate_token_pair(config: &Config, payload: &TokenPayload) -> Result<TokenPair> {
    Ok(TokenPair {
        access_token: issue_token(config, TokenKind::Access, payload)?,
        refresh_token: issue_token(config, TokenKind::Refresh, payload)?,
        expires_in: config.access_token_expiry_seconds,
    })
}

fn decode_claims(config: &Config, kind: TokenKind, token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(kind.secret(config)),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

/// Returns the payload of a correctly signed, unexpired token.
pub fn verify_token(config: &Config, kind: TokenKind, token: &str) -> Option<TokenPayload> {
    decode_claims(config, kind, token).map(|claims| TokenPayload {
        user_id: claims.user_id,
        email: claims.email,
    })
}

/// `exp` (epoch seconds) of a correctly signed, unexpired token.
pub fn token_expiry(config: &Config, kind: TokenKind, token: &str) -> Option<u64> {
    decode_claims(config, kind, token).map(|claims| claims.exp)
}

/// Refresh tokens revoked before their expiry. Entries whose token has
/// expired are dropped on insert; verification rejects those anyway.
#[derive(Debug, Default)]
pub struct RevokedTokens {
    expiry_by_token: HashMap<String, u64>,
}

impl RevokedTokens {
    pub fn contains(&self, token: &str) -> bool {
        self.expiry_by_token.contains_key(token)
    }

    pub fn insert(&mut self, token: &str, exp: u64, now: u64) {
        self.expiry_by_token.retain(|_, exp| *exp > now);
        self.expiry_by_token.insert(token.to_string(), exp);
    }

    pub fn len(&self) -> usize {
        self.expiry_by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiry_by_token.is_empty()
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

pub async fn find_user(state: &Arc<AppState>, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;
    Ok(user)
}

/// Resolves the bearer token to a [`User`] and stores it in request
/// extensions for the handlers behind this layer.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Authorization token is required".to_string()))?;

    let payload = verify_token(&state.config, TokenKind::Access, token)
        .ok_or_else(|| AppError::Unauthorized("Token is invalid or expired".to_string()))?;

    let user = find_user(&state, &payload.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> Config {
        Config::from_pairs([
            ("JWT_SECRET", "access-secret"),
            ("JWT_REFRESH_SECRET", "refresh-secret"),
        ])
        .unwrap()
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            user_id: "5b0c3f1e-0000-4000-8000-000000000001".into(),
            email: "ana@example.com".into(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_pair_is_signed_with_separate_secrets() {
        let config = config();
        let pair = generate_token_pair(&config, &payload()).unwrap();
        assert_eq!(pair.expires_in, 900);

        assert_eq!(
            verify_token(&config, TokenKind::Access, &pair.access_token),
            Some(payload())
        );
        assert_eq!(
            verify_token(&config, TokenKind::Refresh, &pair.refresh_token),
            Some(payload())
        );
        assert!(verify_token(&config, TokenKind::Refresh, &pair.access_token).is_none());
        assert!(verify_token(&config, TokenKind::Access, &pair.refresh_token).is_none());
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let config = config();
        let a = issue_token(&config, TokenKind::Refresh, &payload()).unwrap();
        let b = issue_token(&config, TokenKind::Refresh, &payload()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = Config::from_pairs([
            ("JWT_SECRET", "access-secret"),
            ("JWT_REFRESH_SECRET", "refresh-secret"),
            ("ACCESS_TOKEN_EXPIRY_SECONDS", "0"),
        ])
        .unwrap();
        let token = issue_token(&config, TokenKind::Access, &payload()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(verify_token(&config, TokenKind::Access, &token).is_none());
    }

    #[test]
    fn test_revoked_tokens_drop_expired_entries() {
        let mut revoked = RevokedTokens::default();
        revoked.insert("old", 100, 50);
        revoked.insert("fresh", 500, 50);
        assert!(revoked.contains("old"));
        assert_eq!(revoked.len(), 2);

        revoked.insert("newest", 900, 200);
        assert!(!revoked.contains("old"));
        assert!(revoked.contains("fresh"));
        assert!(revoked.contains("newest"));
        assert_eq!(revoked.len(), 2);
    }

    #[test]
    fn test_token_expiry_matches_lifetime() {
        let config = config();
        let token = issue_token(&config, TokenKind::Refresh, &payload()).unwrap();
        let now = Utc::now().timestamp() as u64;
        let exp = token_expiry(&config, TokenKind::Refresh, &token).unwrap();
        assert!(exp >= now + config.refresh_token_expiry_seconds - 1);
        assert!(exp <= now + config.refresh_token_expiry_seconds + 1);
        assert!(token_expiry(&config, TokenKind::Access, &token).is_none());
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }
}
