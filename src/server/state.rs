use crate::{
    cache::ReelsCache,
    config::Config,
    error::{ReelcastError, Result},
    refresh::RefreshCoordinator,
    reels::ReelsService,
    store::ReelStore,
    upstream::{self, HttpReelSource, ReelSource},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Reels read path and the refresh coordinator behind it
    pub reels: ReelsService,
    /// Prometheus handle, present only when a recorder was installed
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Create state backed by the configured upstream API
    pub fn new(config: Config) -> Result<Self> {
        let client = upstream::build_client()
            .map_err(|e| ReelcastError::InternalError(format!("HTTP client: {e}")))?;
        let source = HttpReelSource::new(
            client,
            config.upstream_url.clone(),
            config.upstream_token.clone(),
            config.upstream_batch_size,
            config.brand_name.clone(),
        );
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Create state with an arbitrary reels source
    pub fn with_source(config: Config, source: Arc<dyn ReelSource>) -> Self {
        let store = ReelStore::in_data_dir(&config.data_dir);
        let cache = ReelsCache::with_ttl(config.cache_ttl());
        let coordinator = Arc::new(RefreshCoordinator::new(source, store, cache));

        Self {
            config: Arc::new(config),
            reels: ReelsService::new(coordinator),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        self.reels.coordinator()
    }
}
