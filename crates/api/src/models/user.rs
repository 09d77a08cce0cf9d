//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketstall_core::{Email, Role, UserId};

/// An account (domain type). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Role checked by the auth gate.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Values for a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
}
