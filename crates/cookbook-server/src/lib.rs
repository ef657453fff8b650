//! HTTP front of the cookbook: router, shared state, and the startup step
//! that prepares the recipe store.

pub mod api_recipes;
pub mod config;
pub mod openapi;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Json, Router};
use config::DatabaseConfig;
use cookbook_db::{DbPool, MigrationError, PoolError};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Each request checks out one connection for its data-access call.
    pub pool: DbPool,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("no database connection available: {0}")]
    Connection(#[from] r2d2::Error),
    #[error(transparent)]
    Schema(#[from] MigrationError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens the pool and makes sure the recipes schema exists.
///
/// Must finish before the router is reachable. Existing data is kept.
pub fn open_store(database: &DatabaseConfig) -> Result<DbPool, StartupError> {
    let pool = cookbook_db::create_pool(&database.path, database.pool_settings())?;
    let applied = cookbook_db::run_migrations(&*pool.get()?)?;
    tracing::info!(path = %database.path, applied, "recipe store ready");
    Ok(pool)
}

const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::doc())
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/openapi.json", get(openapi_json))
        .route(
            "/recipes",
            get(api_recipes::list_recipes_handler).post(api_recipes::create_recipe_handler),
        )
        .route("/recipes/{id}", get(api_recipes::get_recipe_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
