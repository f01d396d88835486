//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use yatube_infra::database::DatabaseConfig;

/// Posts per page on the index, group and profile listings.
pub const POSTS_PER_PAGE: u64 = 10;

/// Posts per page on the follow feed.
pub const FEED_POSTS_PER_PAGE: u64 = 5;

/// Where unauthenticated visitors are sent, with `?next=<path>`.
pub const LOGIN_URL: &str = "/auth/login/";

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "yatube_session";

/// Uploaded post images live under this directory of the media root.
pub const POST_IMAGE_DIR: &str = "posts";

/// Largest accepted request body, image uploads included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which backend holds cached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub cache_backend: CacheBackend,
    pub index_cache_ttl: Duration,
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            cache_backend: CacheBackend::Memory,
            index_cache_ttl: Duration::from_secs(20),
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            if let Some(max) = parsed("DB_MAX_CONNECTIONS") {
                config.max_connections = max;
            }
            if let Some(min) = parsed("DB_MIN_CONNECTIONS") {
                config.min_connections = min;
            }
            config
        });

        let cache_backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to in-memory page cache");
                CacheBackend::Memory
            }),
            Err(_) => defaults.cache_backend,
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            database,
            cache_backend,
            index_cache_ttl: parsed("INDEX_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.index_cache_ttl),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url: env::var("MEDIA_URL")
                .map(|url| normalize_media_url(&url))
                .unwrap_or(defaults.media_url),
        }
    }

    /// Public URL of a stored media reference.
    pub fn media_url_for(&self, reference: &str) -> String {
        format!("{}{}", self.media_url, reference)
    }
}

fn normalize_media_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    format!("{trimmed}/")
}
