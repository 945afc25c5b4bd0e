pub mod auth;
pub mod body_stats;
pub mod health;
pub mod weather;

use crate::{AppError, Result};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

pub async fn status() -> Json<Value> {
    Json(json!({
        "engine": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "app": env!("CARGO_PKG_NAME"),
    }))
}

pub async fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": false, "error": "Route not found" })),
    )
        .into_response()
}

/// Unwraps a JSON body. Rejections keep their own status (400, 413, 415,
/// 422) but use the same envelope as every other error.
pub(crate) fn json_body(body: std::result::Result<Json<Value>, JsonRejection>) -> Result<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        })
}

pub(crate) fn success_data<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub(crate) fn success_message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

pub(crate) fn success_message_data<T: Serialize>(message: &str, data: T) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}
