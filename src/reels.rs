//! Read path for the reels dataset.
//!
//! Sources are consulted cheapest first: fresh cache, then the file on disk,
//! then a forced upstream refresh when nothing has ever been stored.

use crate::{
    error::{ReelcastError, Result},
    models::ReelsDataset,
    refresh::RefreshCoordinator,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ReelsService {
    coordinator: Arc<RefreshCoordinator>,
}

impl ReelsService {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Current dataset for serving.
    ///
    /// A stale or empty cache is re-hydrated from disk (stamped with the load
    /// time). Only a missing file triggers a network fetch.
    pub async fn current(&self) -> Result<Arc<ReelsDataset>> {
        let cache = self.coordinator.cache();
        if let Some(entry) = cache.get_fresh() {
            return Ok(entry.dataset.clone());
        }

        let seen = cache.generation();
        if let Some(dataset) = self.coordinator.store().read_if_exists().await? {
            let dataset = Arc::new(dataset);
            // Loses to any refresh that committed while we were reading
            if cache.set_if_generation(dataset.clone(), Utc::now(), seen) {
                debug!("Hydrated reels cache from disk ({} reels)", dataset.len());
            }
            return Ok(dataset);
        }

        info!("No stored reels, forcing upstream refresh");
        self.coordinator.refresh_if_empty().await?;
        cache
            .get()
            .map(|entry| entry.dataset.clone())
            .ok_or_else(|| ReelcastError::InternalError("reels cache empty after refresh".into()))
    }
}
