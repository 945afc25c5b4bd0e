use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::time::Instant;

pub const ENTITY: &str = "android.health-connect.api";

/// Every client is answered in JSON, whatever it asked for.
pub async fn normalize_accept(mut request: Request, next: Next) -> Response {
    let is_json = request
        .headers()
        .get(ACCEPT)
        .map(|v| v.as_bytes() == b"application/json")
        .unwrap_or(false);

    if !is_json {
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
    }

    next.run(request).await
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Adds `time` (handling time in ms) and `entity` to JSON object bodies.
pub async fn decorate_json(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;

    if !is_json_response(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut value = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        _ => return Response::from_parts(parts, Body::from(bytes)),
    };

    value.insert("time".into(), Value::from(started.elapsed().as_millis() as u64));
    value.insert("entity".into(), Value::from(ENTITY));

    let decorated = match serde_json::to_vec(&value) {
        Ok(decorated) => decorated,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(decorated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        middleware::from_fn,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn router() -> Router {
        Router::new()
            .route("/object", get(|| async { Json(json!({"ok": true})) }))
            .route("/array", get(|| async { Json(json!([1, 2])) }))
            .route("/text", get(|| async { "plain" }))
            .route(
                "/accept",
                get(|headers: axum::http::HeaderMap| async move {
                    headers
                        .get(ACCEPT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(from_fn(normalize_accept))
            .layer(from_fn(decorate_json))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header(ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_object_bodies_are_decorated() {
        let response = router().oneshot(get_request("/object")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["entity"], ENTITY);
        assert!(body["time"].is_u64());
    }

    #[tokio::test]
    async fn test_other_bodies_pass_through() {
        let response = router().oneshot(get_request("/array")).await.unwrap();
        assert_eq!(body_json(response).await, json!([1, 2]));

        let response = router().oneshot(get_request("/text")).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain");
    }

    #[tokio::test]
    async fn test_accept_header_is_forced_to_json() {
        let response = router().oneshot(get_request("/accept")).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"application/json");
    }
}
