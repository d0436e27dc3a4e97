mod category;
mod dictionary;
mod health;
mod quiz;
mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(health::router())
        .merge(category::router())
        .merge(dictionary::router())
        .merge(quiz::router())
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

/// Empty listings answer with a bare 404.
pub(crate) fn empty_listing() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn fallback_handler() -> Response {
    AppError::not_found("Route not found").into_response()
}
