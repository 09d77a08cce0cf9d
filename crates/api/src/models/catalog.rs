//! Catalog records as the repositories see them.
//!
//! Repositories store every kind in one shape: the display fields are an
//! opaque JSON object, plus the `title` column that duplicate checks and
//! slug derivation read. Services convert to and from the typed
//! [`CatalogItem`] of a specific [`CatalogSchema`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use marketstall_core::{CatalogItem, CatalogItemId, CatalogKind, CatalogSchema, ImageRef, Slug};

use crate::db::RepositoryError;

/// A stored catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub id: CatalogItemId,
    pub kind: CatalogKind,
    pub slug: Slug,
    pub title: String,
    pub fields: Value,
    pub image: ImageRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Decode the display fields as schema `S`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` when the stored row belongs to
    /// another kind or its fields do not match the schema.
    pub fn into_item<S: CatalogSchema>(self) -> Result<CatalogItem<S::Fields>, RepositoryError> {
        if self.kind != S::KIND {
            return Err(RepositoryError::DataCorruption(format!(
                "catalog item {} is a {}, expected {}",
                self.id,
                self.kind,
                S::KIND
            )));
        }
        let fields = serde_json::from_value(self.fields).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid {} fields in store: {e}", S::KIND))
        })?;

        Ok(CatalogItem {
            id: self.id,
            slug: self.slug,
            fields,
            image: self.image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// Re-encode a typed item of schema `S` for writing back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the fields cannot be
    /// serialized.
    pub fn from_item<S: CatalogSchema>(
        item: &CatalogItem<S::Fields>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: item.id,
            kind: S::KIND,
            slug: item.slug.clone(),
            title: S::title(&item.fields).to_string(),
            fields: encode_fields::<S>(&item.fields)?,
            image: item.image.clone(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }
}

/// A catalog row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRecord {
    pub kind: CatalogKind,
    pub slug: Slug,
    pub title: String,
    pub fields: Value,
    pub image: ImageRef,
}

impl NewCatalogRecord {
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the fields cannot be
    /// serialized.
    pub fn new<S: CatalogSchema>(
        slug: Slug,
        fields: &S::Fields,
        image: ImageRef,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            kind: S::KIND,
            slug,
            title: S::title(fields).to_string(),
            fields: encode_fields::<S>(fields)?,
            image,
        })
    }
}

fn encode_fields<S: CatalogSchema>(fields: &S::Fields) -> Result<Value, RepositoryError> {
    serde_json::to_value(fields).map_err(|e| {
        RepositoryError::DataCorruption(format!("cannot encode {} fields: {e}", S::KIND))
    })
}

/// Listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Only rows whose boolean display field equals the value.
    pub flag: Option<(&'static str, bool)>,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return, `None` for all.
    pub limit: Option<u64>,
}

impl CatalogQuery {
    /// Whether `fields` passes the flag filter.
    #[must_use]
    pub fn matches(&self, fields: &Value) -> bool {
        self.flag.is_none_or(|(name, wanted)| {
            fields.get(name).and_then(Value::as_bool).unwrap_or(false) == wanted
        })
    }
}

/// One page of a listing plus the filtered total.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub items: Vec<CatalogRecord>,
    pub total: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{FormFields, Product, Trending};
    use serde_json::json;

    use super::*;

    fn shirt_record() -> CatalogRecord {
        let fields = Product::parse_new(
            &FormFields::new()
                .with("title", "Red Shirt")
                .with("price", "1000")
                .with("description", "Cotton"),
        )
        .unwrap();
        let new = NewCatalogRecord::new::<Product>(
            Slug::derive("Red Shirt", "product"),
            &fields,
            ImageRef {
                image_name: "1_red.png".to_string(),
                image_url: "http://localhost/uploads/1_red.png".to_string(),
            },
        )
        .unwrap();
        CatalogRecord {
            id: CatalogItemId::new(1),
            kind: new.kind,
            slug: new.slug,
            title: new.title,
            fields: new.fields,
            image: new.image,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_round_trips_through_typed_item() {
        let record = shirt_record();
        assert_eq!(record.title, "Red Shirt");

        let item = record.clone().into_item::<Product>().unwrap();
        assert_eq!(item.fields.item.title, "Red Shirt");

        let back = CatalogRecord::from_item::<Product>(&item).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_into_item_rejects_other_kind() {
        let err = shirt_record().into_item::<Trending>().unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_query_flag_matching() {
        let query = CatalogQuery {
            flag: Some(("isBestSelling", true)),
            ..CatalogQuery::default()
        };
        assert!(query.matches(&json!({"isBestSelling": true})));
        assert!(!query.matches(&json!({"isBestSelling": false})));
        assert!(!query.matches(&json!({})));
        assert!(CatalogQuery::default().matches(&json!({})));
    }
}
