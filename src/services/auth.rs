use crate::auth::{self, TokenKind, TokenPayload};
use crate::models::{
    AuthResponse, LoginRequest, PasswordChange, ProfileUpdate, TokenPair, User, UserSummary,
};
use crate::validation::ValidationErrors;
use crate::{AppError, AppState, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Option<String>,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub fcm_token: Option<String>,
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create_user(pool: &SqlitePool, new_user: NewUser) -> Result<User> {
    let id = new_user
        .id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let password_hash = auth::hash_password(&new_user.password)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, fcm_token, full_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.email)
    .bind(&password_hash)
    .bind(&new_user.fcm_token)
    .bind(&new_user.full_name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!("Created user {} ({})", new_user.email, id);

    let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

fn payload_for(user: &User) -> TokenPayload {
    TokenPayload {
        user_id: user.id.clone(),
        email: user.email.clone(),
    }
}

pub async fn login(state: &Arc<AppState>, credentials: &LoginRequest) -> Result<AuthResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = find_by_email(&state.db, &credentials.email)
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&credentials.password, &user.password_hash) {
        return Err(invalid());
    }

    let tokens = auth::generate_token_pair(&state.config, &payload_for(&user))?;

    Ok(AuthResponse {
        user: UserSummary::from(&user),
        tokens,
    })
}

pub async fn refresh(state: &Arc<AppState>, refresh_token: &str) -> Result<TokenPair> {
    if state.revoked_tokens.read().await.contains(refresh_token) {
        return Err(AppError::Unauthorized("Token is invalid".to_string()));
    }

    let payload = auth::verify_token(&state.config, TokenKind::Refresh, refresh_token)
        .ok_or_else(|| AppError::Unauthorized("Refresh token is invalid or expired".to_string()))?;

    let user = auth::find_user(state, &payload.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    auth::generate_token_pair(&state.config, &payload_for(&user))
}

pub async fn revoke(state: &Arc<AppState>, refresh_token: &str) -> Result<()> {
    let exp = auth::token_expiry(&state.config, TokenKind::Refresh, refresh_token)
        .ok_or_else(|| AppError::Unauthorized("Token is invalid".to_string()))?;

    let now = Utc::now().timestamp().max(0) as u64;
    state
        .revoked_tokens
        .write()
        .await
        .insert(refresh_token, exp, now);
    Ok(())
}

pub async fn update_fcm_token(pool: &SqlitePool, user_id: &str, fcm_token: &str) -> Result<()> {
    let result = sqlx::query("UPDATE users SET fcm_token = ?, updated_at = ? WHERE id = ?")
        .bind(fcm_token)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub async fn update_profile(pool: &SqlitePool, user: &User, update: ProfileUpdate) -> Result<User> {
    if let Some(email) = &update.email {
        let taken: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(&user.id)
            .fetch_optional(pool)
            .await?;
        if taken.is_some() {
            return Err(ValidationErrors::single(
                "email",
                "A record with the same email already exists.",
            )
            .into());
        }
    }

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = COALESCE(?, full_name),
            email = COALESCE(?, email),
            birthdate = COALESCE(?, birthdate),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.full_name)
    .bind(&update.email)
    .bind(update.birthdate.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(pool)
    .await?;

    let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(user)
}

pub async fn change_password(pool: &SqlitePool, user: &User, change: &PasswordChange) -> Result<()> {
    if !auth::verify_password(&change.current_password, &user.password_hash) {
        return Err(ValidationErrors::single("current_password", "Current password is incorrect").into());
    }

    let new_hash = auth::hash_password(&change.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&new_hash)
        .bind(Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(pool)
        .await?;

    tracing::info!("Password changed for user {}", user.id);
    Ok(())
}
