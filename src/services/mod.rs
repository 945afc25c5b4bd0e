//! Business logic behind the HTTP handlers.

pub mod auth;
pub mod body_stats;
pub mod health;
pub mod weather;
