use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

pub const GREETING: &str = "Hello, from reactive handler;)";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
}

async fn greeting() -> &'static str {
    GREETING
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    store_connected: bool,
    start_time: String,
    uptime: u64,
    timestamp: String,
}

async fn health(State(state): State<AppState>) -> Response {
    let store = state.store();
    let connected = match store.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, backend = store.backend(), "store ping failed");
            false
        }
    };

    let response = HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        store: store.backend(),
        store_connected: connected,
        start_time: DateTime::<Utc>::from(state.started_at_system())
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response)).into_response()
}
