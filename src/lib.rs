pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::StoreError;
use crate::state::AppState;

/// Router with request tracing and permissive CORS around every route.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> axum::Router {
    routes::router(state, max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(config: &Config) -> Result<axum::Router, StoreError> {
    let store = db::connect(&config.db).await?;
    let state = AppState::from_config(config, store);
    Ok(build_router(state, config.max_upload_bytes))
}
