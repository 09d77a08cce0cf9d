//! Business logic between the routes and the repositories.
//!
//! Services take validated input, talk to repositories and the asset store,
//! and report failures as [`ServiceError`] without knowing about HTTP.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod slug;

use thiserror::Error;

use marketstall_core::{CartError, ValidationError};

use crate::assets::AssetError;
use crate::db::RepositoryError;

pub use cart::{CartService, ProductRef};
pub use catalog::{CatalogService, ListParams, Listing, Pagination};
pub use slug::unique_slug;

/// Errors from the catalog and cart services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The addressed record or line does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("repository error: {0}")]
    Repository(RepositoryError),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound => Self::NotFound("Not found".to_string()),
            other => Self::Repository(other),
        }
    }
}

impl From<CartError> for ServiceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound => Self::NotFound("Item not found".to_string()),
            CartError::Invalid(invalid) => Self::Validation(invalid),
        }
    }
}
