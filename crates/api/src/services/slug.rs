//! Collision-free slugs.

use marketstall_core::{CatalogItemId, CatalogKind, Slug};

use crate::db::{CatalogRepository, RepositoryError};

/// Derive a slug for `text` that no other live record of `kind` holds.
///
/// Tries the base slug, then `base-2`, `base-3`, ... against the store. A
/// candidate held by `exclude` counts as free, so a record can keep its own
/// slug on update. Nothing reserves the result: a concurrent writer may take
/// it first, which the store's unique index reports as a conflict.
///
/// # Errors
///
/// Returns `RepositoryError` if a probe fails.
pub async fn unique_slug(
    catalog: &dyn CatalogRepository,
    kind: CatalogKind,
    text: &str,
    exclude: Option<CatalogItemId>,
) -> Result<Slug, RepositoryError> {
    let base = Slug::derive(text, kind.fallback_slug());

    let mut n: u32 = 1;
    loop {
        let candidate = base.with_suffix(n);
        match catalog.slug_owner(kind, candidate.as_str()).await? {
            None => return Ok(candidate),
            Some(owner) if Some(owner) == exclude => return Ok(candidate),
            Some(_) => {
                n = n
                    .checked_add(1)
                    .ok_or_else(|| RepositoryError::Conflict("Slug already exists".to_owned()))?;
            }
        }
    }
}
