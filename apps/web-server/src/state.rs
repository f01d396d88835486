//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, MediaStorage, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use yatube_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryStore, JwtConfig, JwtTokenService,
    LocalMediaStorage,
};

#[cfg(feature = "postgres")]
use yatube_infra::database::{
    PostgresCommentRepository, PostgresFollowRepository, PostgresGroupRepository,
    PostgresPostRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, CacheBackend};
use crate::page_cache::PageCache;
use crate::render::Renderer;

/// Repository set backed by one storage engine.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    /// `postgres` or `memory`, reported by the health check.
    pub backend: &'static str,
}

impl Repositories {
    pub fn in_memory(store: &InMemoryStore) -> Self {
        Self {
            users: Arc::new(store.users()),
            groups: Arc::new(store.groups()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            follows: Arc::new(store.follows()),
            backend: "memory",
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(db: sea_orm::DbConn) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            groups: Arc::new(PostgresGroupRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            follows: Arc::new(PostgresFollowRepository::new(db)),
            backend: "postgres",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub page_cache: PageCache,
    pub media: Arc<dyn MediaStorage>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub renderer: Arc<Renderer>,
    pub config: Arc<AppConfig>,
    pub backend: &'static str,
}

impl AppState {
    /// Assemble state from already-built components.
    pub fn from_parts(
        config: AppConfig,
        repos: Repositories,
        cache: Arc<dyn Cache>,
        media: Arc<dyn MediaStorage>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Result<Self, tera::Error> {
        Ok(Self {
            users: repos.users,
            groups: repos.groups,
            posts: repos.posts,
            comments: repos.comments,
            follows: repos.follows,
            page_cache: PageCache::new(cache, config.index_cache_ttl),
            media,
            tokens,
            passwords,
            renderer: Arc::new(Renderer::new()?),
            config: Arc::new(config),
            backend: repos.backend,
        })
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: AppConfig) -> Result<Self, tera::Error> {
        let repos = Self::repositories(&config).await;
        let cache = Self::cache(&config).await;
        let media: Arc<dyn MediaStorage> = Arc::new(LocalMediaStorage::new(&config.media_root));
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig::from_env()));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        let state = Self::from_parts(config, repos, cache, media, tokens, passwords)?;
        tracing::info!(backend = state.backend, "Application state initialized");
        Ok(state)
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Repositories::in_memory(&InMemoryStore::new());
        };

        match yatube_infra::database::connect(db_config).await {
            Ok(db) => Repositories::postgres(db),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Repositories::in_memory(&InMemoryStore::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(config: &AppConfig) -> Repositories {
        if config.database.is_some() {
            tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
        }
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Repositories::in_memory(&InMemoryStore::new())
    }

    async fn cache(config: &AppConfig) -> Arc<dyn Cache> {
        match config.cache_backend {
            CacheBackend::Memory => Arc::new(InMemoryCache::new()),
            CacheBackend::Redis => Self::redis_cache().await,
        }
    }

    #[cfg(feature = "redis")]
    async fn redis_cache() -> Arc<dyn Cache> {
        match yatube_infra::RedisCache::new(yatube_infra::RedisConfig::from_env()).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}. Using in-memory cache.", e);
                Arc::new(InMemoryCache::new())
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn redis_cache() -> Arc<dyn Cache> {
        tracing::warn!("CACHE_BACKEND=redis ignored: built without the redis feature");
        Arc::new(InMemoryCache::new())
    }
}
