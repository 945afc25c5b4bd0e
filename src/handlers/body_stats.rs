use super::{json_body, success_data, success_message_data};
use crate::models::User;
use crate::services::body_stats;
use crate::{validation, AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    period: Option<String>,
}

pub async fn latest(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>> {
    let values = body_stats::latest(&state.db, &user.id).await?;
    Ok(success_data(values))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(field): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    let (field, period) = validation::history_params(&field, query.period.as_deref())?;
    let items = body_stats::history(&state.db, &user.id, field, period).await?;
    Ok(success_data(json!({
        "field": field.as_str(),
        "period": period.as_str(),
        "history": items,
    })))
}

pub async fn today(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>> {
    let record = body_stats::today(&state.db, &user.id).await?;
    Ok(success_data(record))
}

pub async fn create_or_update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let update = validation::body_stats(&json_body(body)?)?;
    let record = body_stats::create_or_update_today(&state.db, &user.id, &update).await?;
    Ok(success_message_data("Body stats updated successfully", record))
}
