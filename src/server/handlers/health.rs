use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Liveness plus a summary of the reels cache
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let cached = state.coordinator().cache().get();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "cached_reels": cached.as_ref().map_or(0, |entry| entry.dataset.len()),
        "last_refreshed_at": cached.as_ref().map(|entry| entry.fetched_at.to_rfc3339()),
    }))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed\n").into_response(),
    }
}
