use super::{json_body, success_data, success_message, success_message_data};
use crate::models::User;
use crate::services::auth as auth_service;
use crate::{validation, AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub async fn login(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let credentials = validation::login(&json_body(body)?)?;
    let response = auth_service::login(&state, &credentials).await?;

    tracing::info!("User {} logged in", response.user.id);
    Ok(success_message_data("Login successful", response))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let token = validation::refresh_token(&json_body(body)?)?;
    let tokens = auth_service::refresh(&state, &token).await?;
    Ok(success_data(tokens))
}

pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let token = validation::refresh_token(&json_body(body)?)?;
    auth_service::revoke(&state, &token).await?;
    Ok(success_message("Token revoked successfully"))
}

pub async fn update_fcm_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let fcm_token = validation::fcm_token(&json_body(body)?)?;
    auth_service::update_fcm_token(&state.db, &user.id, &fcm_token).await?;
    Ok(success_message("FCM token updated successfully"))
}

pub async fn me(Extension(user): Extension<User>) -> Json<Value> {
    success_data(user)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let update = validation::profile(&json_body(body)?, Utc::now().date_naive())?;
    let updated = auth_service::update_profile(&state.db, &user, update).await?;
    Ok(success_message_data("Profile updated successfully", updated))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let change = validation::password_change(&json_body(body)?)?;
    auth_service::change_password(&state.db, &user, &change).await?;
    Ok(success_message("Password changed successfully"))
}
