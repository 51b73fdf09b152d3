use super::status_of;
use crate::{
    error::{ReelcastError, Result},
    files, metrics,
    server::state::AppState,
    store::REELS_RELATIVE_PATH,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use std::path::Path as FsPath;
use std::time::Instant;
use tracing::info;

/// List every JSON document under the data root
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Value>> {
    let start = Instant::now();

    let root = state.config.data_dir.clone();
    let result = tokio::task::spawn_blocking(move || files::list_json_files(&root))
        .await
        .map_err(|e| ReelcastError::InternalError(e.to_string()))
        .and_then(|listed| listed.map_err(ReelcastError::from))
        .map(|found| Json(json!({ "files": found })));

    metrics::record_request("files", status_of(&result));
    metrics::record_duration("files", start);
    result
}

/// Serve one JSON document
///
/// The reels document is served through the reels cache rather than straight
/// from disk.
pub async fn get_file(
    Path(requested): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let start = Instant::now();
    info!("Serving file: {}", requested);

    let result = serve_document(&state, requested).await;

    metrics::record_request("file", status_of(&result));
    metrics::record_duration("file", start);
    result
}

async fn serve_document(state: &AppState, requested: String) -> Result<Json<Value>> {
    let relative = files::normalize(&requested)?;
    if relative == FsPath::new(REELS_RELATIVE_PATH) {
        let dataset = state.reels.current().await?;
        let value = serde_json::to_value(&*dataset)
            .map_err(|e| ReelcastError::InternalError(e.to_string()))?;
        return Ok(Json(value));
    }

    let root = state.config.data_dir.clone();
    let value = tokio::task::spawn_blocking(move || {
        let path = files::resolve(&root, &requested)?;
        files::read_json(&path)
    })
    .await
    .map_err(|e| ReelcastError::InternalError(e.to_string()))??;

    Ok(Json(value))
}
