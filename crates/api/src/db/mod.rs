//! Persistence for the API.
//!
//! # Tables
//!
//! - `app_user` - Accounts (email, argon2 hash, role)
//! - `catalog_item` - Products, trending and most-sales banners, features.
//!   One table keyed by `kind`; display fields live in a JSONB column.
//!   A unique index on `(kind, lower(slug))` backs the slug invariant.
//! - `cart` - One JSONB document of line items per user
//!
//! Every repository is a trait with a `PostgreSQL` implementation; the
//! `test-util` feature adds in-memory implementations with the same
//! constraint behaviour.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p marketstall-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketstall_core::{Cart, CatalogItemId, CatalogKind, Email, UserId};

use crate::models::{CatalogPage, CatalogQuery, CatalogRecord, NewCatalogRecord, NewUser, User};

pub use carts::PgCartRepository;
pub use catalog::PgCatalogRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict(message)`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

/// Catalog records of every kind.
///
/// Slug and title comparisons are case-insensitive. Implementations reject an
/// insert or update that would give two live records of one kind the same
/// slug with `RepositoryError::Conflict`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert a record; id and timestamps are assigned by the store.
    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, RepositoryError>;

    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError>;

    async fn find_by_id(
        &self,
        kind: CatalogKind,
        id: CatalogItemId,
    ) -> Result<Option<CatalogRecord>, RepositoryError>;

    /// Id of the record currently holding `slug`, if any.
    async fn slug_owner(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItemId>, RepositoryError>;

    /// Whether another record of `kind` has this title.
    async fn title_taken(
        &self,
        kind: CatalogKind,
        title: &str,
        exclude: Option<CatalogItemId>,
    ) -> Result<bool, RepositoryError>;

    /// Newest first.
    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
    ) -> Result<CatalogPage, RepositoryError>;

    /// Overwrite slug, title, fields and image of `record.id`; bumps
    /// `updated_at`.
    ///
    /// Returns `RepositoryError::NotFound` when the record is gone.
    async fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord, RepositoryError>;

    /// Delete and return the record holding `slug`.
    async fn delete_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError>;
}

/// Cart documents, one per user.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, user: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Insert or replace the user's cart. Last write wins.
    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError>;
}

/// Accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// The user and its stored password hash.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// The repositories a running API uses.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
        }
    }

    /// Fresh, empty in-memory repositories.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn memory() -> Self {
        Self {
            catalog: Arc::new(memory::MemoryCatalogRepository::default()),
            carts: Arc::new(memory::MemoryCartRepository::default()),
            users: Arc::new(memory::MemoryUserRepository::default()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
