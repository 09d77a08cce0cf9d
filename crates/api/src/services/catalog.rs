//! Catalog lifecycle, written once for every kind.
//!
//! `CatalogService<S>` drives create, list, get, update and delete for the
//! kind described by schema `S`. Each record owns exactly one image:
//!
//! - a create or update validates everything it can before storing the new
//!   image, and deletes that image again if anything fails afterwards;
//! - a replaced image is deleted only once the record pointing at the new
//!   one has been saved;
//! - a delete removes the record first, then its image.

use std::marker::PhantomData;

use serde::Serialize;
use url::Url;

use marketstall_core::{
    CatalogItem, CatalogItemId, CatalogKind, CatalogSchema, FormFields, ImageRef, ValidationError,
};

use super::ServiceError;
use super::slug::unique_slug;
use crate::assets::{self, AssetStore, Upload};
use crate::db::CatalogRepository;
use crate::models::{CatalogQuery, CatalogRecord, NewCatalogRecord};

/// Page size used when the client sends none, and the largest accepted.
pub const MAX_PAGE_SIZE: u64 = 9;

/// Raw listing parameters as the client sent them.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Value of the kind's flag filter (`bestSelling` for products).
    pub flag: Option<String>,
}

/// Pagination summary for paginated kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// A listing; `pagination` is set for paginated kinds only.
#[derive(Debug, Clone)]
pub struct Listing<F> {
    pub items: Vec<CatalogItem<F>>,
    pub pagination: Option<Pagination>,
}

/// `page >= 1`, default 1. Unparseable values fall back to the default.
fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map_or(1, |page| u64::try_from(page.max(1)).unwrap_or(1))
}

/// `1..=MAX_PAGE_SIZE`, default `MAX_PAGE_SIZE`.
fn parse_limit(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map_or(MAX_PAGE_SIZE, |limit| {
            u64::try_from(limit.max(1)).map_or(MAX_PAGE_SIZE, |limit| limit.min(MAX_PAGE_SIZE))
        })
}

/// Catalog operations for the kind described by `S`.
pub struct CatalogService<'a, S> {
    catalog: &'a dyn CatalogRepository,
    assets: &'a dyn AssetStore,
    schema: PhantomData<S>,
}

impl<'a, S: CatalogSchema> CatalogService<'a, S> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogRepository, assets: &'a dyn AssetStore) -> Self {
        Self {
            catalog,
            assets,
            schema: PhantomData,
        }
    }

    const fn kind() -> CatalogKind {
        S::KIND
    }

    fn not_found() -> ServiceError {
        ServiceError::NotFound(format!("{} not found", Self::kind().label()))
    }

    fn duplicate_title() -> ServiceError {
        let kind = Self::kind();
        ServiceError::Conflict(format!(
            "{} with this {} already exists",
            kind.label(),
            kind.title_field()
        ))
    }

    async fn ensure_title_free(
        &self,
        title: &str,
        exclude: Option<CatalogItemId>,
    ) -> Result<(), ServiceError> {
        let kind = Self::kind();
        if kind.unique_titles() && self.catalog.title_taken(kind, title, exclude).await? {
            return Err(Self::duplicate_title());
        }
        Ok(())
    }

    async fn store_image(&self, upload: &Upload, origin: &Url) -> Result<ImageRef, ServiceError> {
        let image_name = self.assets.store(upload).await?;
        let image_url = assets::public_url(origin, &image_name);
        Ok(ImageRef {
            image_name,
            image_url,
        })
    }

    /// Create a record from a form and its image.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing image or invalid fields, `Conflict` for a
    /// duplicate title or a slug lost to a concurrent create, otherwise
    /// repository or asset failures.
    pub async fn create(
        &self,
        form: &FormFields,
        image: Option<Upload>,
        origin: &Url,
    ) -> Result<CatalogItem<S::Fields>, ServiceError> {
        let upload =
            image.ok_or_else(|| ValidationError::Other("Image is required".to_string()))?;
        let fields = S::parse_new(form)?;
        self.ensure_title_free(S::title(&fields), None).await?;

        let image = self.store_image(&upload, origin).await?;
        let stored_name = image.image_name.clone();

        let result = self.insert(&fields, image).await;
        match &result {
            Ok(item) => {
                tracing::info!(kind = %Self::kind(), id = %item.id, slug = %item.slug, "Catalog item created");
            }
            Err(_) => assets::discard(self.assets, &stored_name).await,
        }
        result
    }

    async fn insert(
        &self,
        fields: &S::Fields,
        image: ImageRef,
    ) -> Result<CatalogItem<S::Fields>, ServiceError> {
        let kind = Self::kind();
        let slug = unique_slug(self.catalog, kind, S::title(fields), None).await?;
        let record = NewCatalogRecord::new::<S>(slug, fields, image)?;
        let stored = self.catalog.insert(record).await?;
        Ok(stored.into_item::<S>()?)
    }

    /// Newest first. Paginated kinds honour page, limit and flag filter;
    /// other kinds return everything.
    ///
    /// # Errors
    ///
    /// Returns repository failures.
    pub async fn list(&self, params: &ListParams) -> Result<Listing<S::Fields>, ServiceError> {
        let kind = Self::kind();
        if !kind.paginated() {
            let page = self.catalog.list(kind, &CatalogQuery::default()).await?;
            return Ok(Listing {
                items: decode_all::<S>(page.items)?,
                pagination: None,
            });
        }

        let page = parse_page(params.page.as_deref());
        let limit = parse_limit(params.limit.as_deref());
        let flag = kind
            .flag_filter()
            .zip(params.flag.as_deref())
            .map(|(name, raw)| (name, raw.trim() == "true"));

        let query = CatalogQuery {
            flag,
            offset: (page - 1).saturating_mul(limit),
            limit: Some(limit),
        };
        let result = self.catalog.list(kind, &query).await?;

        Ok(Listing {
            items: decode_all::<S>(result.items)?,
            pagination: Some(Pagination::new(page, limit, result.total)),
        })
    }

    /// Case-insensitive slug lookup.
    ///
    /// # Errors
    ///
    /// `NotFound` when no record holds the slug.
    pub async fn get(&self, slug: &str) -> Result<CatalogItem<S::Fields>, ServiceError> {
        let record = self
            .catalog
            .find_by_slug(Self::kind(), slug)
            .await?
            .ok_or_else(Self::not_found)?;
        Ok(record.into_item::<S>()?)
    }

    /// Apply the provided fields and, optionally, a replacement image.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Validation` for invalid provided fields, `Conflict` for a
    /// duplicate title, otherwise repository or asset failures.
    pub async fn update(
        &self,
        slug: &str,
        form: &FormFields,
        image: Option<Upload>,
        origin: &Url,
    ) -> Result<CatalogItem<S::Fields>, ServiceError> {
        let kind = Self::kind();
        let mut item = self.get(slug).await?;
        let patch = S::parse_patch(form)?;

        let new_title = S::patch_title(&patch)
            .filter(|title| *title != S::title(&item.fields))
            .map(str::to_string);
        if let Some(title) = &new_title {
            self.ensure_title_free(title, Some(item.id)).await?;
        }
        S::apply(&mut item.fields, patch);

        let mut replaced = None;
        if let Some(upload) = &image {
            let fresh = self.store_image(upload, origin).await?;
            replaced = Some((std::mem::replace(&mut item.image, fresh.clone()), fresh));
        }

        let result = self.save(item, new_title.as_deref()).await;
        match (&result, replaced) {
            (Ok(saved), Some((old, _))) => {
                tracing::info!(kind = %kind, id = %saved.id, "Catalog item image replaced");
                assets::discard(self.assets, &old.image_name).await;
            }
            (Err(_), Some((_, fresh))) => {
                assets::discard(self.assets, &fresh.image_name).await;
            }
            _ => {}
        }
        result
    }

    async fn save(
        &self,
        mut item: CatalogItem<S::Fields>,
        new_title: Option<&str>,
    ) -> Result<CatalogItem<S::Fields>, ServiceError> {
        if let Some(title) = new_title {
            item.slug = unique_slug(self.catalog, Self::kind(), title, Some(item.id)).await?;
        }
        let record = CatalogRecord::from_item::<S>(&item)?;
        let saved = self.catalog.update(&record).await?;
        Ok(saved.into_item::<S>()?)
    }

    /// Delete the record holding `slug`, then its image.
    ///
    /// # Errors
    ///
    /// `NotFound` when no record holds the slug.
    pub async fn delete(&self, slug: &str) -> Result<(), ServiceError> {
        let record = self
            .catalog
            .delete_by_slug(Self::kind(), slug)
            .await?
            .ok_or_else(Self::not_found)?;

        tracing::info!(kind = %record.kind, id = %record.id, "Catalog item deleted");
        assets::discard(self.assets, &record.image.image_name).await;
        Ok(())
    }
}

fn decode_all<S: CatalogSchema>(
    records: Vec<CatalogRecord>,
) -> Result<Vec<CatalogItem<S::Fields>>, ServiceError> {
    records
        .into_iter()
        .map(|record| record.into_item::<S>().map_err(ServiceError::from))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::Bytes;
    use marketstall_core::{Product, Trending};

    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::db::memory::MemoryCatalogRepository;

    fn origin() -> Url {
        Url::parse("http://localhost:5000").unwrap()
    }

    fn image(name: &str) -> Option<Upload> {
        Some(Upload::new(name, "image/png", Bytes::from_static(b"png")).unwrap())
    }

    fn shirt(title: &str, best: bool) -> FormFields {
        FormFields::new()
            .with("title", title)
            .with("price", "1000")
            .with("sizes", "S,M")
            .with("description", "Cotton tee")
            .with("isBestSelling", if best { "true" } else { "false" })
    }

    fn banner(heading: &str) -> FormFields {
        FormFields::new()
            .with("heading", heading)
            .with("subheading", "Up to 50% off")
            .with("btnText", "Shop now")
    }

    #[test]
    fn test_page_and_limit_parsing() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("4")), 4);

        assert_eq!(parse_limit(None), 9);
        assert_eq!(parse_limit(Some("0")), 1);
        assert_eq!(parse_limit(Some("50")), 9);
        assert_eq!(parse_limit(Some("3")), 3);
    }

    #[test]
    fn test_pagination_summary() {
        let p = Pagination::new(2, 9, 20);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let empty = Pagination::new(1, 9, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[tokio::test]
    async fn test_create_duplicate_product_titles_get_suffixed_slugs() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Product>::new(&repo, &assets);

        let first = service
            .create(&shirt("Red Shirt", false), image("a.png"), &origin())
            .await
            .unwrap();
        let second = service
            .create(&shirt("Red Shirt", false), image("b.png"), &origin())
            .await
            .unwrap();

        assert_eq!(first.slug.as_str(), "red-shirt");
        assert_eq!(second.slug.as_str(), "red-shirt-2");
        assert!(first.image.image_url.starts_with("http://localhost:5000/uploads/"));
        assert_eq!(assets.names().await.len(), 2);
    }

    #[tokio::test]
    async fn test_create_requires_image_and_valid_fields() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Product>::new(&repo, &assets);

        let missing_image = service
            .create(&shirt("Red Shirt", false), None, &origin())
            .await
            .unwrap_err();
        assert_eq!(missing_image.to_string(), "Image is required");

        let form = FormFields::new()
            .with("title", "Tee")
            .with("price", "-1")
            .with("description", "d");
        let err = service.create(&form, image("a.png"), &origin()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(assets.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_unique_title_kinds_reject_duplicates_without_leaking_images() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Trending>::new(&repo, &assets);

        service
            .create(&banner("Summer Sale"), image("a.png"), &origin())
            .await
            .unwrap();
        let err = service
            .create(&banner("summer sale"), image("b.png"), &origin())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.to_string(), "Trending item with this heading already exists");
        assert_eq!(assets.names().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_paginates_and_filters_products() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Product>::new(&repo, &assets);

        for i in 0..12 {
            service
                .create(&shirt(&format!("Tee {i}"), i % 3 == 0), image("t.png"), &origin())
                .await
                .unwrap();
        }

        let page_two = service
            .list(&ListParams {
                page: Some("2".to_string()),
                ..ListParams::default()
            })
            .await
            .unwrap();
        let pagination = page_two.pagination.unwrap();
        assert_eq!(page_two.items.len(), 3);
        assert_eq!(pagination.total, 12);
        assert_eq!(pagination.total_pages, 2);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);

        let best = service
            .list(&ListParams {
                flag: Some("true".to_string()),
                ..ListParams::default()
            })
            .await
            .unwrap();
        assert_eq!(best.pagination.unwrap().total, 4);
        assert!(best.items.iter().all(|item| item.fields.is_best_selling));
        // newest first
        assert_eq!(best.items[0].fields.item.title, "Tee 9");
    }

    #[tokio::test]
    async fn test_list_unpaginated_kind_returns_everything() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Trending>::new(&repo, &assets);
        for heading in ["A", "B", "C"] {
            service.create(&banner(heading), image("x.png"), &origin()).await.unwrap();
        }

        let listing = service
            .list(&ListParams {
                limit: Some("1".to_string()),
                ..ListParams::default()
            })
            .await
            .unwrap();
        assert_eq!(listing.items.len(), 3);
        assert!(listing.pagination.is_none());
    }

    #[tokio::test]
    async fn test_update_renames_and_replaces_image() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Product>::new(&repo, &assets);

        let created = service
            .create(&shirt("Red Shirt", false), image("old.png"), &origin())
            .await
            .unwrap();

        let updated = service
            .update(
                "RED-SHIRT",
                &FormFields::new().with("title", "Blue Shirt"),
                image("new.png"),
                &origin(),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.slug.as_str(), "blue-shirt");
        assert_eq!(updated.fields.item.price, created.fields.item.price);
        assert!(!assets.contains(&created.image.image_name).await);
        assert!(assets.contains(&updated.image.image_name).await);
        assert!(matches!(
            service.get("red-shirt").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_rename_onto_existing_title() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Trending>::new(&repo, &assets);
        service.create(&banner("Summer"), image("a.png"), &origin()).await.unwrap();
        let winter = service.create(&banner("Winter"), image("b.png"), &origin()).await.unwrap();

        let err = service
            .update("winter", &banner("SUMMER"), image("c.png"), &origin())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Unchanged record, no stray upload
        let still = service.get("winter").await.unwrap();
        assert_eq!(still.image, winter.image);
        assert_eq!(assets.names().await.len(), 2);

        // Renaming onto its own heading is fine
        service
            .update("winter", &FormFields::new().with("heading", "Winter"), None, &origin())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_image() {
        let repo = MemoryCatalogRepository::default();
        let assets = MemoryAssetStore::default();
        let service = CatalogService::<Product>::new(&repo, &assets);
        service
            .create(&shirt("Red Shirt", false), image("a.png"), &origin())
            .await
            .unwrap();

        service.delete("red-shirt").await.unwrap();
        assert!(assets.names().await.is_empty());
        assert!(matches!(
            service.delete("red-shirt").await,
            Err(ServiceError::NotFound(message)) if message == "Product not found"
        ));
    }
}
