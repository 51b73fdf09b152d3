use super::status_of;
use crate::{
    error::{ReelcastError, Result},
    metrics,
    pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, paginate},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::info;

/// Query parameters for `GET /reels`
#[derive(Debug, Deserialize)]
pub struct ReelsParams {
    /// 1-based page number (default: 1)
    page: Option<usize>,
    /// Page size, 1-100 (default: 20)
    limit: Option<usize>,
}

/// Serve one page of cached reels
pub async fn list_reels(
    State(state): State<AppState>,
    params: std::result::Result<Query<ReelsParams>, QueryRejection>,
) -> Result<Response> {
    let start = Instant::now();

    let result = async {
        let Query(params) = params.map_err(|e| ReelcastError::Validation(e.body_text()))?;
        let page = params.page.unwrap_or(DEFAULT_PAGE);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

        let dataset = state.reels.current().await?;
        let body = paginate(&dataset.reels, page, limit)?;
        Ok::<_, ReelcastError>(Json(body).into_response())
    }
    .await;

    metrics::record_request("reels", status_of(&result));
    metrics::record_duration("reels", start);
    result
}

/// Force an upstream refresh now
pub async fn refresh_reels(State(state): State<AppState>) -> Result<Response> {
    let start = Instant::now();
    info!("Manual reels refresh requested");

    let result = state
        .coordinator()
        .refresh_now()
        .await
        .map(|outcome| {
            Json(json!({
                "status": "success",
                "message": format!("Refreshed {} reels", outcome.count),
                "videos_count": outcome.count,
            }))
            .into_response()
        })
        .map_err(ReelcastError::from);

    metrics::record_request("refresh", status_of(&result));
    metrics::record_duration("refresh", start);
    result
}
