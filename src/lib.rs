//! Reelcast: JSON document API with a durable, self-refreshing reels cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod files;
pub mod http_retry;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod reels;
pub mod refresh;
pub mod server;
pub mod store;
pub mod upstream;
