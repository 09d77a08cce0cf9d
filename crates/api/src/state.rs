//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::assets::AssetStore;
use crate::config::ApiConfig;
use crate::db::{CartRepository, CatalogRepository, Repositories, UserRepository};
use crate::services::auth::JwtService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the repositories, the asset store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    repositories: Repositories,
    assets: Arc<dyn AssetStore>,
    jwt: JwtService,
    pool: Option<PgPool>,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool, assets: Arc<dyn AssetStore>) -> Self {
        let repositories = Repositories::postgres(&pool);
        Self::build(config, repositories, assets, Some(pool))
    }

    /// State over arbitrary repositories. Readiness always reports ready.
    #[must_use]
    pub fn with_repositories(
        config: ApiConfig,
        repositories: Repositories,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self::build(config, repositories, assets, None)
    }

    fn build(
        config: ApiConfig,
        repositories: Repositories,
        assets: Arc<dyn AssetStore>,
        pool: Option<PgPool>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repositories,
                assets,
                jwt,
                pool,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.repositories.catalog.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &dyn CartRepository {
        self.inner.repositories.carts.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.inner.repositories.users.as_ref()
    }

    #[must_use]
    pub fn assets(&self) -> &dyn AssetStore {
        self.inner.assets.as_ref()
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.inner.jwt
    }

    /// The database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
