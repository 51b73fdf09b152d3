//! In-memory freshness cache for the reels dataset.
//!
//! Holds exactly one snapshot: the last dataset that was committed to disk or
//! loaded from it, together with the time it was fetched. Freshness is
//! evaluated on read; nothing expires entries in the background.

use crate::models::ReelsDataset;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

/// Default TTL for the cached dataset.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Immutable dataset + timestamp pair. Always replaced as a whole.
#[derive(Debug)]
pub struct CachedReels {
    pub dataset: Arc<ReelsDataset>,
    pub fetched_at: DateTime<Utc>,
    /// Number of refreshes committed when this snapshot was stored.
    pub generation: u64,
}

impl CachedReels {
    fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age < ttl,
            // fetched_at in the future (clock skew, future mtime)
            Err(_) => true,
        }
    }
}

/// Thread-safe single-entry cache with TTL-based freshness.
#[derive(Clone, Debug)]
pub struct ReelsCache {
    entry: Arc<RwLock<Option<Arc<CachedReels>>>>,
    ttl: Duration,
}

impl ReelsCache {
    /// Create an empty cache with the default 5-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, fresh or not.
    pub fn get(&self) -> Option<Arc<CachedReels>> {
        self.entry
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Current snapshot only if it is still within the TTL.
    pub fn get_fresh(&self) -> Option<Arc<CachedReels>> {
        match self.get() {
            Some(entry) if entry.is_fresh_at(Utc::now(), self.ttl) => {
                debug!("Reels cache HIT");
                Some(entry)
            }
            Some(_) => {
                debug!("Reels cache STALE");
                None
            }
            None => {
                debug!("Reels cache MISS");
                None
            }
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.get()
            .is_some_and(|entry| entry.is_fresh_at(Utc::now(), self.ttl))
    }

    /// Refresh commits so far; 0 while only hydrated from disk or empty.
    pub fn generation(&self) -> u64 {
        self.get().map_or(0, |entry| entry.generation)
    }

    /// Replace the snapshot in one swap, keeping the current generation.
    pub fn set(&self, dataset: Arc<ReelsDataset>, fetched_at: DateTime<Utc>) {
        let mut entry = self.entry.write().unwrap_or_else(|p| p.into_inner());
        let generation = entry.as_ref().map_or(0, |e| e.generation);
        *entry = Some(Arc::new(CachedReels {
            dataset,
            fetched_at,
            generation,
        }));
    }

    /// Publish a newly committed refresh and return its generation.
    pub fn commit(&self, dataset: Arc<ReelsDataset>, fetched_at: DateTime<Utc>) -> u64 {
        let mut entry = self.entry.write().unwrap_or_else(|p| p.into_inner());
        let generation = entry.as_ref().map_or(0, |e| e.generation) + 1;
        *entry = Some(Arc::new(CachedReels {
            dataset,
            fetched_at,
            generation,
        }));
        generation
    }

    /// Replace the snapshot only if no refresh was committed since `seen`.
    /// Returns whether the snapshot was stored.
    pub fn set_if_generation(
        &self,
        dataset: Arc<ReelsDataset>,
        fetched_at: DateTime<Utc>,
        seen: u64,
    ) -> bool {
        let mut entry = self.entry.write().unwrap_or_else(|p| p.into_inner());
        let generation = entry.as_ref().map_or(0, |e| e.generation);
        if generation != seen {
            return false;
        }
        *entry = Some(Arc::new(CachedReels {
            dataset,
            fetched_at,
            generation,
        }));
        true
    }
}

impl Default for ReelsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reel;

    fn dataset(caption: &str) -> Arc<ReelsDataset> {
        Arc::new(ReelsDataset::new(vec![Reel {
            thumbnail_url: "t".to_string(),
            video_url: "v".to_string(),
            caption: caption.to_string(),
        }]))
    }

    #[test]
    fn empty_cache_is_not_fresh() {
        let cache = ReelsCache::new();
        assert!(cache.get().is_none());
        assert!(cache.get_fresh().is_none());
        assert!(!cache.is_fresh());
    }

    #[test]
    fn cache_hit_within_ttl() {
        let cache = ReelsCache::new();
        cache.set(dataset("a"), Utc::now());

        assert!(cache.is_fresh());
        assert_eq!(cache.get_fresh().unwrap().dataset.reels[0].caption, "a");
    }

    #[test]
    fn stale_entry_is_kept_but_not_fresh() {
        let cache = ReelsCache::new();
        cache.set(dataset("old"), Utc::now() - chrono::Duration::seconds(301));

        assert!(!cache.is_fresh());
        assert!(cache.get_fresh().is_none());
        assert!(cache.get().is_some(), "stale data stays available");
    }

    #[test]
    fn cache_miss_after_ttl() {
        let cache = ReelsCache::with_ttl(Duration::from_millis(1));
        cache.set(dataset("a"), Utc::now());

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get_fresh().is_none(), "Entry should be stale after TTL");
    }

    #[test]
    fn set_replaces_whole_snapshot() {
        let cache = ReelsCache::new();
        let t1 = Utc::now() - chrono::Duration::seconds(10);
        cache.set(dataset("old"), t1);
        let held = cache.get().unwrap();

        cache.set(dataset("new"), Utc::now());

        // Readers holding the previous snapshot are unaffected
        assert_eq!(held.dataset.reels[0].caption, "old");
        assert_eq!(held.fetched_at, t1);
        assert_eq!(cache.get().unwrap().dataset.reels[0].caption, "new");
    }

    #[test]
    fn commit_bumps_generation_and_set_keeps_it() {
        let cache = ReelsCache::new();
        assert_eq!(cache.generation(), 0);

        assert_eq!(cache.commit(dataset("a"), Utc::now()), 1);
        cache.set(dataset("b"), Utc::now());
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.commit(dataset("c"), Utc::now()), 2);
    }

    #[test]
    fn conditional_set_loses_to_a_newer_commit() {
        let cache = ReelsCache::new();
        let seen = cache.generation();

        cache.commit(dataset("refreshed"), Utc::now());

        assert!(!cache.set_if_generation(dataset("from disk"), Utc::now(), seen));
        assert_eq!(cache.get().unwrap().dataset.reels[0].caption, "refreshed");

        assert!(cache.set_if_generation(dataset("from disk"), Utc::now(), 1));
        assert_eq!(cache.get().unwrap().dataset.reels[0].caption, "from disk");
        assert_eq!(cache.generation(), 1);
    }
}
