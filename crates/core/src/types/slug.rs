//! URL-safe slugs derived from display titles.
//!
//! A slug only ever contains lowercase ASCII letters, digits and single
//! hyphens, and never starts or ends with a hyphen. Uniqueness against the
//! store is not this module's concern: the api crate probes candidates
//! produced by [`Slug::with_suffix`] until one is free.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Normalize free text into slug form.
///
/// Lowercases, drops quote characters, collapses every run of characters
/// outside `[a-z0-9]` into a single `-` and trims hyphens from both ends.
/// Returns an empty string when nothing survives.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.trim().chars().flat_map(char::to_lowercase) {
        if ch == '\'' || ch == '"' {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// A normalized slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from `text`, using `fallback` when `text` has no
    /// slug-able characters at all.
    #[must_use]
    pub fn derive(text: &str, fallback: &str) -> Self {
        let base = slugify(text);
        if base.is_empty() {
            Self(slugify(fallback))
        } else {
            Self(base)
        }
    }

    /// Candidate number `n` for this base: `n <= 1` is the base itself,
    /// otherwise `base-n`.
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        if n <= 1 {
            self.clone()
        } else {
            Self(format!("{}-{n}", self.0))
        }
    }

    /// Wrap a slug read back from the store without re-normalizing it.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive comparison, matching how slugs are looked up.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
