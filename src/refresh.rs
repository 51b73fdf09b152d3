//! Refresh coordination: fetch → persist → publish, one at a time.
//!
//! Every path that replaces the reels dataset (manual trigger, periodic job,
//! startup bootstrap, cold reads) goes through [`RefreshCoordinator`], which
//! holds a single async mutex for the whole sequence. A failure at any stage
//! leaves both the file and the cache as they were.

use crate::{
    cache::ReelsCache,
    metrics,
    models::ReelsDataset,
    store::{ReelStore, StoreError},
    upstream::{ReelSource, UpstreamError},
};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default period of the background refresh job.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("upstream returned no usable reels")]
    Empty,

    #[error("concurrent refresh attempt failed")]
    ConcurrentFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub count: usize,
}

/// How the cache was populated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// Loaded from the existing file, no network call.
    Hydrated { count: usize },
    /// No usable file; fetched from upstream.
    Fetched { count: usize },
}

pub struct RefreshCoordinator {
    source: Arc<dyn ReelSource>,
    store: ReelStore,
    cache: ReelsCache,
    lock: Mutex<()>,
    /// Bumped after every finished refresh attempt, failed or not.
    attempts: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn ReelSource>, store: ReelStore, cache: ReelsCache) -> Self {
        Self {
            source,
            store,
            cache,
            lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &ReelsCache {
        &self.cache
    }

    pub fn store(&self) -> &ReelStore {
        &self.store
    }

    /// Number of successful refreshes since construction.
    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Number of finished refresh attempts since construction.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Run a full refresh, waiting for any in-flight one to finish first.
    pub async fn refresh_now(&self) -> Result<RefreshOutcome, RefreshError> {
        let _guard = self.lock.lock().await;
        self.refresh_locked().await
    }

    /// Run a refresh unless another one committed while this call waited for
    /// the lock. Returns `Ok(None)` when skipped.
    pub async fn refresh_if_idle(&self) -> Result<Option<RefreshOutcome>, RefreshError> {
        let seen = self.generation();
        let _guard = self.lock.lock().await;
        if self.generation() != seen {
            debug!("Refresh committed while waiting for lock, skipping");
            return Ok(None);
        }
        self.refresh_locked().await.map(Some)
    }

    /// Refresh only if nothing has ever been cached. Used by cold reads, so a
    /// burst of them results in a single fetch.
    ///
    /// Callers that waited on an attempt which then failed share that failure
    /// as [`RefreshError::ConcurrentFailure`] instead of fetching again.
    pub async fn refresh_if_empty(&self) -> Result<Option<RefreshOutcome>, RefreshError> {
        let attempted = self.attempts();
        let _guard = self.lock.lock().await;
        if self.cache.get().is_some() {
            return Ok(None);
        }
        if self.attempts() != attempted {
            debug!("Refresh attempt failed while waiting for lock, not retrying");
            return Err(RefreshError::ConcurrentFailure);
        }
        self.refresh_locked().await.map(Some)
    }

    /// Populate the cache at process start.
    ///
    /// An existing file is trusted as-is and stamped with its mtime; only a
    /// missing or unreadable file forces a network fetch.
    pub async fn bootstrap(&self) -> Result<Bootstrap, RefreshError> {
        let _guard = self.lock.lock().await;

        match self.store.load().await {
            Ok(Some(stored)) => {
                let count = stored.dataset.len();
                info!(
                    "Hydrated {} reels from {} (modified {})",
                    count,
                    self.store.path().display(),
                    stored.modified_at
                );
                self.cache.set(Arc::new(stored.dataset), stored.modified_at);
                metrics::set_cached_reels(count);
                return Ok(Bootstrap::Hydrated { count });
            }
            Ok(None) => info!("No stored reels found, fetching from upstream"),
            Err(e) => warn!("Stored reels unreadable ({}), fetching from upstream", e),
        }

        let outcome = self.refresh_locked().await?;
        Ok(Bootstrap::Fetched {
            count: outcome.count,
        })
    }

    async fn refresh_locked(&self) -> Result<RefreshOutcome, RefreshError> {
        let result = self.fetch_store_publish().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);
        result
    }

    async fn fetch_store_publish(&self) -> Result<RefreshOutcome, RefreshError> {
        let dataset = match self.source.fetch_reels().await {
            Ok(dataset) => dataset,
            Err(e) => {
                metrics::record_refresh("upstream_error");
                return Err(e.into());
            }
        };

        if dataset.is_empty() {
            warn!("Upstream returned zero reels, keeping last good data");
            metrics::record_refresh("empty");
            return Err(RefreshError::Empty);
        }

        if let Err(e) = self.store.write_atomic(&dataset).await {
            metrics::record_refresh("store_error");
            return Err(e.into());
        }

        let count = dataset.len();
        self.publish(dataset);
        metrics::record_refresh("success");
        info!("Refreshed reels: {} videos", count);
        Ok(RefreshOutcome { count })
    }

    fn publish(&self, dataset: ReelsDataset) {
        let count = dataset.len();
        self.cache.commit(Arc::new(dataset), Utc::now());
        metrics::set_cached_reels(count);
    }
}

/// Spawn the periodic refresh job.
///
/// Cancellation is only observed while sleeping, so a refresh that has
/// already started always runs to completion.
pub fn spawn_periodic_refresh(
    coordinator: Arc<RefreshCoordinator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_periodic_refresh(coordinator, interval, shutdown))
}

pub async fn run_periodic_refresh(
    coordinator: Arc<RefreshCoordinator>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(
        "Periodic reels refresh every {}s",
        interval.as_secs_f64()
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Periodic reels refresh stopped");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match coordinator.refresh_if_idle().await {
            Ok(Some(outcome)) => debug!("Periodic refresh stored {} reels", outcome.count),
            Ok(None) => {}
            Err(e) => error!("Periodic reels refresh failed: {}", e),
        }
    }
}
