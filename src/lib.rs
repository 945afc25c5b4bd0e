pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod sync;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use services::weather::WeatherClient;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::{AppError, Result};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    /// Refresh tokens revoked since startup, until they expire.
    pub revoked_tokens: RwLock<auth::RevokedTokens>,
    pub weather: WeatherClient,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let weather = WeatherClient::from_config(&config);
        Self {
            db,
            config,
            revoked_tokens: RwLock::new(auth::RevokedTokens::default()),
            weather,
        }
    }
}

fn auth_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/fcm-token", put(handlers::auth::update_fcm_token))
        .route("/me", get(handlers::auth::me))
        .route("/profile", put(handlers::auth::update_profile))
        .route("/password", put(handlers::auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), auth::require_user));

    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh-token", post(handlers::auth::refresh_token))
        .route("/revoke-token", delete(handlers::auth::revoke_token))
        .merge(protected)
}

fn body_stats_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", put(handlers::body_stats::create_or_update))
        .route("/latest", get(handlers::body_stats::latest))
        .route("/today", get(handlers::body_stats::today))
        .route("/history/:field", get(handlers::body_stats::history))
        .route_layer(from_fn_with_state(state.clone(), auth::require_user))
}

fn health_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/archive", post(handlers::health::archive))
        .route("/:permission", post(handlers::health::store))
        .route_layer(from_fn_with_state(state.clone(), auth::require_user))
}

fn weather_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::weather::get_weather))
        .route_layer(from_fn_with_state(state.clone(), auth::require_user))
}

/// Builds the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let body_limit = state.config.max_request_body_bytes();

    Router::new()
        .route("/api/v1/status", get(handlers::status))
        .nest("/api/v1/auth", auth_routes(&state))
        .nest("/api/v1/body-stats", body_stats_routes(&state))
        .nest("/api/v1/health", health_routes(&state))
        .nest("/api/v1/weather", weather_routes(&state))
        .fallback(handlers::route_not_found)
        .layer(from_fn(middleware::decorate_json))
        .layer(from_fn(middleware::normalize_accept))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) async fn test_state() -> Arc<AppState> {
    let config = Config::from_pairs([
        ("JWT_SECRET", "test-access-secret"),
        ("JWT_REFRESH_SECRET", "test-refresh-secret"),
    ])
    .unwrap();
    Arc::new(AppState::new(db::test_pool().await, config))
}
