//! Account management commands.
//!
//! Registration over HTTP always yields a `user`; this is how admins are
//! provisioned.
//!
//! # Usage
//!
//! ```bash
//! marketstall-cli user create -e admin@example.com -p 'long password' -r admin
//! ```

use marketstall_api::config::{ConfigError, database_url_from_env};
use marketstall_api::db::{PgUserRepository, create_pool};
use marketstall_api::services::auth::{AuthError, create_account};
use marketstall_core::{Role, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create an account and print its id.
///
/// # Errors
///
/// Returns `UserError` for an unknown role, an invalid email or password, a
/// duplicate email or a database failure.
pub async fn create(email: &str, password: &str, role: &str) -> Result<UserId, UserError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let pool = create_pool(&database_url_from_env()?).await?;
    let users = PgUserRepository::new(pool);

    tracing::info!("Creating user: {} ({})", email, role);
    let user = create_account(&users, email, password, role).await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}
