use super::{json_body, success_data};
use crate::{validation, AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let coordinates = validation::coordinates(&json_body(body)?)?;
    let report = state.weather.get_weather(coordinates).await?;
    Ok(success_data(report))
}
