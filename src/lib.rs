pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod rooms;

use axum::{extract::FromRef, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub use appresult::{AppError, AppResult};
pub use config::{Config, MembershipPolicy};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub policy: MembershipPolicy,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, policy: MembershipPolicy) -> AppState {
        AppState { db_pool, policy }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(rooms::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
