use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Root directory for served JSON documents and the reels file
    pub data_dir: PathBuf,
    /// Shared secret expected in the `x-api-key` header
    pub api_key: String,
    /// Upstream video API endpoint (POST)
    pub upstream_url: String,
    /// Optional bearer token for the upstream API
    pub upstream_token: Option<String>,
    /// Number of videos requested per upstream call (default: 50)
    pub upstream_batch_size: u32,
    /// Brand used in fallback captions (default: "Reels")
    pub brand_name: String,
    /// Reels cache TTL in seconds (default: 300)
    pub cache_ttl_secs: u64,
    /// Period of the background refresh job in seconds (default: 300)
    pub refresh_interval_secs: u64,
    /// Populate the cache (and fetch if nothing is stored) before serving
    pub refresh_on_startup: bool,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT, API_KEY
    /// and UPSTREAM_URL are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let api_key = if is_dev {
            env::var("API_KEY").unwrap_or_else(|_| "dev-secret".to_string())
        } else {
            env::var("API_KEY").map_err(|_| "API_KEY is required in production")?
        };
        if api_key.is_empty() {
            return Err("API_KEY must not be empty".into());
        }

        let upstream_url = if is_dev {
            env::var("UPSTREAM_URL")
                .unwrap_or_else(|_| "https://api.example.com/v1/videos/list".to_string())
        } else {
            env::var("UPSTREAM_URL").map_err(|_| "UPSTREAM_URL is required in production")?
        };
        match Url::parse(&upstream_url)?.scheme() {
            "http" | "https" => {}
            scheme => return Err(format!("UPSTREAM_URL scheme '{scheme}' not allowed").into()),
        }

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let upstream_token = env::var("UPSTREAM_TOKEN").ok().filter(|t| !t.is_empty());

        let upstream_batch_size = env::var("UPSTREAM_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let brand_name = env::var("BRAND_NAME").unwrap_or_else(|_| "Reels".to_string());

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let refresh_interval_secs: u64 = env::var("REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let refresh_on_startup = env::var("REFRESH_ON_STARTUP")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Config {
            port,
            is_dev,
            data_dir,
            api_key,
            upstream_url,
            upstream_token,
            upstream_batch_size,
            brand_name,
            cache_ttl_secs,
            refresh_interval_secs: refresh_interval_secs.max(1),
            refresh_on_startup,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "DEV_MODE",
        "PORT",
        "API_KEY",
        "UPSTREAM_URL",
        "UPSTREAM_TOKEN",
        "UPSTREAM_BATCH_SIZE",
        "BRAND_NAME",
        "DATA_DIR",
        "CACHE_TTL_SECS",
        "REFRESH_INTERVAL_SECS",
        "REFRESH_ON_STARTUP",
    ];

    /// Clear every config var, set `set`, run `f`, then restore original state.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for k in ALL_VARS {
            // SAFETY: serialized by ENV_LOCK, no other thread touches env vars concurrently.
            unsafe { std::env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { std::env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn dev_mode_uses_defaults() {
        with_env(&[("DEV_MODE", "true")], || {
            let config = Config::from_env().expect("should succeed in dev mode");
            assert!(config.is_dev);
            assert_eq!(config.port, 8000);
            assert_eq!(config.api_key, "dev-secret");
            assert_eq!(config.data_dir, PathBuf::from("data"));
            assert_eq!(config.upstream_batch_size, 50);
            assert_eq!(config.brand_name, "Reels");
            assert_eq!(config.cache_ttl(), Duration::from_secs(300));
            assert_eq!(config.refresh_interval(), Duration::from_secs(300));
            assert!(config.refresh_on_startup);
            assert!(config.upstream_token.is_none());
        });
    }

    #[test]
    fn prod_mode_requires_port() {
        with_env(&[], || {
            assert!(Config::from_env().is_err(), "Should fail without PORT");
        });
    }

    #[test]
    fn prod_mode_requires_api_key() {
        with_env(
            &[("PORT", "8080"), ("UPSTREAM_URL", "https://api.example.com/v")],
            || {
                assert!(Config::from_env().is_err(), "Should fail without API_KEY");
            },
        );
    }

    #[test]
    fn prod_mode_requires_upstream_url() {
        with_env(&[("PORT", "8080"), ("API_KEY", "k")], || {
            assert!(Config::from_env().is_err(), "Should fail without UPSTREAM_URL");
        });
    }

    #[test]
    fn prod_mode_with_required_vars() {
        with_env(
            &[
                ("PORT", "8080"),
                ("API_KEY", "k"),
                ("UPSTREAM_URL", "https://api.example.com/v1/videos"),
                ("UPSTREAM_TOKEN", "tok"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(!config.is_dev);
                assert_eq!(config.port, 8080);
                assert_eq!(config.upstream_token.as_deref(), Some("tok"));
            },
        );
    }

    #[test]
    fn rejects_non_http_upstream() {
        with_env(
            &[("DEV_MODE", "true"), ("UPSTREAM_URL", "ftp://api.example.com/list")],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn rejects_empty_api_key() {
        with_env(&[("DEV_MODE", "true"), ("API_KEY", "")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn intervals_parsed() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("CACHE_TTL_SECS", "60"),
                ("REFRESH_INTERVAL_SECS", "0"),
                ("REFRESH_ON_STARTUP", "false"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.cache_ttl_secs, 60);
                assert_eq!(config.refresh_interval_secs, 1, "zero interval clamped");
                assert!(!config.refresh_on_startup);
            },
        );
    }
}
