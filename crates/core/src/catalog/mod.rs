//! Catalog records and their per-kind schema descriptors.
//!
//! Products, trending banners, most-sales banners and features all share one
//! lifecycle: created from a form plus exactly one image, addressed by slug,
//! partially updated, deleted together with their image. The parts that
//! differ between kinds (which fields exist, which one is the title, whether
//! titles must be unique, whether listing is paginated) are described by a
//! [`CatalogKind`] plus a [`CatalogSchema`] implementation, so the store and
//! the service are written once.

mod form;
mod schemas;

use core::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{CatalogItemId, Slug};
use crate::validation::ValidationError;

pub use form::FormFields;
pub use schemas::{
    BannerFields, BannerPatch, Feature, MerchFields, MerchPatch, MostSales, Product,
    ProductFields, ProductPatch, Trending,
};

/// The four independently stored catalog kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Product,
    Trending,
    MostSales,
    Feature,
}

impl CatalogKind {
    pub const ALL: [Self; 4] = [Self::Product, Self::Trending, Self::MostSales, Self::Feature];

    /// Value of the `kind` column in the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Trending => "trending",
            Self::MostSales => "most_sales",
            Self::Feature => "feature",
        }
    }

    /// Path segment the kind is mounted under (`/api/<segment>`).
    #[must_use]
    pub const fn route_segment(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Trending => "trending",
            Self::MostSales => "most-sales",
            Self::Feature => "features",
        }
    }

    /// Slug used when the title has no slug-able characters.
    #[must_use]
    pub const fn fallback_slug(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Trending => "trending",
            Self::MostSales => "most-sales",
            Self::Feature => "feature",
        }
    }

    /// Human label used in response messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Trending => "Trending item",
            Self::MostSales => "Most Sales item",
            Self::Feature => "Feature",
        }
    }

    /// Form field the slug is derived from.
    #[must_use]
    pub const fn title_field(&self) -> &'static str {
        match self {
            Self::Product | Self::Feature => "title",
            Self::Trending | Self::MostSales => "heading",
        }
    }

    /// Whether a case-insensitive duplicate title is rejected with a
    /// conflict. Products tolerate duplicates and rely on slug suffixing.
    #[must_use]
    pub const fn unique_titles(&self) -> bool {
        !matches!(self, Self::Product)
    }

    /// Boolean field that listing may filter on.
    #[must_use]
    pub const fn flag_filter(&self) -> Option<&'static str> {
        match self {
            Self::Product => Some("isBestSelling"),
            _ => None,
        }
    }

    /// Whether listing is paginated.
    #[must_use]
    pub const fn paginated(&self) -> bool {
        matches!(self, Self::Product)
    }

    /// Parse the store's `kind` column.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the single image a catalog record owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Filename inside the asset store.
    pub image_name: String,
    /// Public URL the image is served from.
    pub image_url: String,
}

/// A persisted catalog record of some kind, with its typed display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem<F> {
    pub id: CatalogItemId,
    pub slug: Slug,
    #[serde(flatten)]
    pub fields: F,
    #[serde(flatten)]
    pub image: ImageRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schema descriptor for one catalog kind.
///
/// Parsing happens once, at the boundary: `parse_new` and `parse_patch`
/// turn raw form fields into already-validated values, and nothing
/// downstream re-validates them.
pub trait CatalogSchema: Send + Sync + 'static {
    const KIND: CatalogKind;

    /// Display fields persisted for this kind.
    type Fields: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Partial update: `None` leaves the stored value untouched.
    type Patch: fmt::Debug + Send + 'static;

    /// Validate a creation form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when a required field is missing or blank
    /// or a typed field does not parse.
    fn parse_new(form: &FormFields) -> Result<Self::Fields, ValidationError>;

    /// Validate an update form. Provided fields follow the creation rules.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when a provided field is invalid.
    fn parse_patch(form: &FormFields) -> Result<Self::Patch, ValidationError>;

    /// The title-like field the slug derives from.
    fn title(fields: &Self::Fields) -> &str;

    /// The new title, when the patch changes it.
    fn patch_title(patch: &Self::Patch) -> Option<&str>;

    /// Overwrite every field the patch provides.
    fn apply(fields: &mut Self::Fields, patch: Self::Patch);
}
