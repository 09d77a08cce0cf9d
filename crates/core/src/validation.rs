//! Validation errors raised while turning request input into domain values.
//!
//! Every boundary parser (catalog forms, cart requests, auth payloads)
//! reports through [`ValidationError`]; the api crate maps all of them to
//! `400 Bad Request` with the `Display` text as the client message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// A field was present but malformed.
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    /// A size outside the product's declared set.
    #[error("Invalid size selection")]
    InvalidSize,

    /// Free-form message for checks that span several fields.
    #[error("{0}")]
    Other(String),
}

impl ValidationError {
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::Missing { field }
    }

    #[must_use]
    pub const fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
