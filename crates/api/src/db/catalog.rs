//! `PostgreSQL` catalog repository.
//!
//! Queries are checked at runtime (`query_as`) against the `catalog_item`
//! table. Slug lookups compare `lower(slug)` so they hit the
//! `(kind, lower(slug))` unique index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;

use marketstall_core::{CatalogItemId, CatalogKind, ImageRef, Slug};

use super::{CatalogRepository, RepositoryError, conflict_on_unique};
use crate::models::{CatalogPage, CatalogQuery, CatalogRecord, NewCatalogRecord};

const SLUG_CONFLICT: &str = "Slug already exists";

const RETURNING: &str =
    "id, kind, slug, title, fields, image_name, image_url, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CatalogRow {
    id: i32,
    kind: String,
    slug: String,
    title: String,
    fields: Value,
    image_name: String,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogRecord {
    type Error = RepositoryError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let kind = CatalogKind::from_stored(&row.kind).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown catalog kind in database: {}", row.kind))
        })?;

        Ok(Self {
            id: CatalogItemId::new(row.id),
            kind,
            slug: Slug::from_stored(row.slug),
            title: row.title,
            fields: row.fields,
            image: ImageRef {
                image_name: row.image_name,
                image_url: row.image_url,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// JSONB containment filter; `{}` matches every row.
fn flag_filter(query: &CatalogQuery) -> Value {
    let mut filter = Map::new();
    if let Some((name, wanted)) = query.flag {
        filter.insert(name.to_string(), Value::Bool(wanted));
    }
    Value::Object(filter)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Catalog repository over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            INSERT INTO catalog_item (kind, slug, title, fields, image_name, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RETURNING}
            "
        ))
        .bind(record.kind.as_str())
        .bind(record.slug.as_str())
        .bind(&record.title)
        .bind(&record.fields)
        .bind(&record.image.image_name)
        .bind(&record.image.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_CONFLICT))?;

        row.try_into()
    }

    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            SELECT {RETURNING}
            FROM catalog_item
            WHERE kind = $1 AND lower(slug) = lower($2)
            "
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_id(
        &self,
        kind: CatalogKind,
        id: CatalogItemId,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            SELECT {RETURNING}
            FROM catalog_item
            WHERE kind = $1 AND id = $2
            "
        ))
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn slug_owner(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItemId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CatalogItemId>(
            r"
            SELECT id FROM catalog_item
            WHERE kind = $1 AND lower(slug) = lower($2)
            ",
        )
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn title_taken(
        &self,
        kind: CatalogKind,
        title: &str,
        exclude: Option<CatalogItemId>,
    ) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM catalog_item
                WHERE kind = $1
                  AND lower(title) = lower($2)
                  AND ($3::INTEGER IS NULL OR id <> $3)
            )
            ",
        )
        .bind(kind.as_str())
        .bind(title)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
    ) -> Result<CatalogPage, RepositoryError> {
        let filter = flag_filter(query);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM catalog_item WHERE kind = $1 AND fields @> $2",
        )
        .bind(kind.as_str())
        .bind(&filter)
        .fetch_one(&self.pool)
        .await?;

        // LIMIT NULL is LIMIT ALL
        let rows = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            SELECT {RETURNING}
            FROM catalog_item
            WHERE kind = $1 AND fields @> $2
            ORDER BY created_at DESC, id DESC
            OFFSET $3
            LIMIT $4
            "
        ))
        .bind(kind.as_str())
        .bind(&filter)
        .bind(to_i64(query.offset))
        .bind(query.limit.map(to_i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(CatalogPage {
            items: rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            UPDATE catalog_item
            SET slug = $3, title = $4, fields = $5, image_name = $6, image_url = $7,
                updated_at = NOW()
            WHERE kind = $1 AND id = $2
            RETURNING {RETURNING}
            "
        ))
        .bind(record.kind.as_str())
        .bind(record.id)
        .bind(record.slug.as_str())
        .bind(&record.title)
        .bind(&record.fields)
        .bind(&record.image.image_name)
        .bind(&record.image.image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_CONFLICT))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            DELETE FROM catalog_item
            WHERE kind = $1 AND lower(slug) = lower($2)
            RETURNING {RETURNING}
            "
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_flag_filter_builds_containment_object() {
        let query = CatalogQuery {
            flag: Some(("isBestSelling", false)),
            ..CatalogQuery::default()
        };
        assert_eq!(flag_filter(&query), json!({"isBestSelling": false}));
        assert_eq!(flag_filter(&CatalogQuery::default()), json!({}));
    }

    #[test]
    fn test_row_with_unknown_kind_is_corrupt() {
        let row = CatalogRow {
            id: 1,
            kind: "order".to_string(),
            slug: "x".to_string(),
            title: "X".to_string(),
            fields: json!({}),
            image_name: String::new(),
            image_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            CatalogRecord::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
