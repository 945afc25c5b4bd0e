use super::{json_body, success_message_data};
use crate::models::User;
use crate::services::health;
use crate::{validation, AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn store(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(permission): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let batch = validation::health_batch(&permission, &json_body(body)?)?;
    let result = health::store(&state.db, &user.id, &batch).await?;

    let message = format!("{} {} records stored", result.inserted, batch.permission);
    Ok(success_message_data(&message, result))
}

pub async fn archive(
    Extension(user): Extension<User>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let payload = json_body(body)?;
    health::archive(&user.id, &payload);
    Ok(Json(json!({ "status": true })))
}
