//! The four catalog kinds.
//!
//! Products and features carry merchandise fields (title, price, sizes,
//! description); trending and most-sales banners carry heading text and a
//! button label. Both banner kinds share one field set but stay separate
//! kinds with their own collections and slugs.

use serde::{Deserialize, Serialize};

use super::{CatalogKind, CatalogSchema, FormFields};
use crate::types::Price;
use crate::validation::ValidationError;

/// Merchandise fields shared by products and features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchFields {
    /// Subtitle or sub-category.
    #[serde(default)]
    pub sub: String,
    pub title: String,
    pub price: Price,
    /// Allowed sizes. Empty means the item is not sized.
    #[serde(default)]
    pub sizes: Vec<String>,
    pub description: String,
}

impl MerchFields {
    /// Whether `size` may be chosen for this item.
    ///
    /// A blank size or an unsized item always passes.
    #[must_use]
    pub fn allows_size(&self, size: &str) -> bool {
        size.is_empty() || self.sizes.is_empty() || self.sizes.iter().any(|s| s == size)
    }

    fn parse(form: &FormFields) -> Result<Self, ValidationError> {
        let title = form.required_text("title")?;
        let price = form
            .price("price")?
            .ok_or_else(|| ValidationError::missing("price"))?;
        let description = form.required_text("description")?;

        Ok(Self {
            sub: form.text_or_empty("sub"),
            title,
            price,
            sizes: form.list("sizes").unwrap_or_default(),
            description,
        })
    }
}

/// Partial update of [`MerchFields`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchPatch {
    pub sub: Option<String>,
    pub title: Option<String>,
    pub price: Option<Price>,
    pub sizes: Option<Vec<String>>,
    pub description: Option<String>,
}

impl MerchPatch {
    fn parse(form: &FormFields) -> Result<Self, ValidationError> {
        Ok(Self {
            sub: form.optional_text("sub"),
            title: form.present_text("title")?,
            price: form.price("price")?,
            sizes: form.list("sizes"),
            description: form.present_text("description")?,
        })
    }

    fn apply(self, fields: &mut MerchFields) {
        if let Some(sub) = self.sub {
            fields.sub = sub;
        }
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(price) = self.price {
            fields.price = price;
        }
        if let Some(sizes) = self.sizes {
            fields.sizes = sizes;
        }
        if let Some(description) = self.description {
            fields.description = description;
        }
    }
}

/// Product fields: merchandise plus the best-selling flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    #[serde(flatten)]
    pub item: MerchFields,
    #[serde(default)]
    pub is_best_selling: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub item: MerchPatch,
    pub is_best_selling: Option<bool>,
}

/// Banner fields shared by trending and most-sales entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerFields {
    pub heading: String,
    pub subheading: String,
    pub btn_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerPatch {
    pub heading: Option<String>,
    pub subheading: Option<String>,
    pub btn_text: Option<String>,
}

impl BannerFields {
    fn parse(form: &FormFields) -> Result<Self, ValidationError> {
        Ok(Self {
            heading: form.required_text("heading")?,
            subheading: form.required_text("subheading")?,
            btn_text: form.required_text("btnText")?,
        })
    }
}

impl BannerPatch {
    fn parse(form: &FormFields) -> Result<Self, ValidationError> {
        Ok(Self {
            heading: form.present_text("heading")?,
            subheading: form.present_text("subheading")?,
            btn_text: form.present_text("btnText")?,
        })
    }

    fn apply(self, fields: &mut BannerFields) {
        if let Some(heading) = self.heading {
            fields.heading = heading;
        }
        if let Some(subheading) = self.subheading {
            fields.subheading = subheading;
        }
        if let Some(btn_text) = self.btn_text {
            fields.btn_text = btn_text;
        }
    }
}

/// Shop products; the only kind that can be added to a cart.
#[derive(Debug, Clone, Copy)]
pub struct Product;

/// Feature tiles.
#[derive(Debug, Clone, Copy)]
pub struct Feature;

/// Trending banners.
#[derive(Debug, Clone, Copy)]
pub struct Trending;

/// Most-sales banners.
#[derive(Debug, Clone, Copy)]
pub struct MostSales;

impl CatalogSchema for Product {
    const KIND: CatalogKind = CatalogKind::Product;
    type Fields = ProductFields;
    type Patch = ProductPatch;

    fn parse_new(form: &FormFields) -> Result<ProductFields, ValidationError> {
        Ok(ProductFields {
            item: MerchFields::parse(form)?,
            is_best_selling: form.flag("isBestSelling").unwrap_or(false),
        })
    }

    fn parse_patch(form: &FormFields) -> Result<ProductPatch, ValidationError> {
        Ok(ProductPatch {
            item: MerchPatch::parse(form)?,
            is_best_selling: form.flag("isBestSelling"),
        })
    }

    fn title(fields: &ProductFields) -> &str {
        &fields.item.title
    }

    fn patch_title(patch: &ProductPatch) -> Option<&str> {
        patch.item.title.as_deref()
    }

    fn apply(fields: &mut ProductFields, patch: ProductPatch) {
        patch.item.apply(&mut fields.item);
        if let Some(flag) = patch.is_best_selling {
            fields.is_best_selling = flag;
        }
    }
}

impl CatalogSchema for Feature {
    const KIND: CatalogKind = CatalogKind::Feature;
    type Fields = MerchFields;
    type Patch = MerchPatch;

    fn parse_new(form: &FormFields) -> Result<MerchFields, ValidationError> {
        MerchFields::parse(form)
    }

    fn parse_patch(form: &FormFields) -> Result<MerchPatch, ValidationError> {
        MerchPatch::parse(form)
    }

    fn title(fields: &MerchFields) -> &str {
        &fields.title
    }

    fn patch_title(patch: &MerchPatch) -> Option<&str> {
        patch.title.as_deref()
    }

    fn apply(fields: &mut MerchFields, patch: MerchPatch) {
        patch.apply(fields);
    }
}

macro_rules! banner_schema {
    ($schema:ty, $kind:expr) => {
        impl CatalogSchema for $schema {
            const KIND: CatalogKind = $kind;
            type Fields = BannerFields;
            type Patch = BannerPatch;

            fn parse_new(form: &FormFields) -> Result<BannerFields, ValidationError> {
                BannerFields::parse(form)
            }

            fn parse_patch(form: &FormFields) -> Result<BannerPatch, ValidationError> {
                BannerPatch::parse(form)
            }

            fn title(fields: &BannerFields) -> &str {
                &fields.heading
            }

            fn patch_title(patch: &BannerPatch) -> Option<&str> {
                patch.heading.as_deref()
            }

            fn apply(fields: &mut BannerFields, patch: BannerPatch) {
                patch.apply(fields);
            }
        }
    };
}

banner_schema!(Trending, CatalogKind::Trending);
banner_schema!(MostSales, CatalogKind::MostSales);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn red_shirt_form() -> FormFields {
        FormFields::new()
            .with("title", " Red Shirt ")
            .with("price", "1000")
            .with("sizes", "S,M")
            .with("description", "Cotton tee")
    }

    #[test]
    fn test_product_parse_new() {
        let fields = Product::parse_new(&red_shirt_form()).unwrap();
        assert_eq!(fields.item.title, "Red Shirt");
        assert_eq!(fields.item.price, Price::parse("1000").unwrap());
        assert_eq!(fields.item.sizes, vec!["S", "M"]);
        assert_eq!(fields.item.sub, "");
        assert!(!fields.is_best_selling);
    }

    #[test]
    fn test_product_parse_new_requires_fields() {
        let form = FormFields::new().with("title", "Tee").with("description", "d");
        assert_eq!(
            Product::parse_new(&form),
            Err(ValidationError::missing("price"))
        );

        let negative: FormFields = [
            ("title", "Tee"),
            ("price", "-5"),
            ("description", "d"),
        ]
        .into_iter()
        .collect();
        assert!(Product::parse_new(&negative).is_err());
    }

    #[test]
    fn test_product_patch_leaves_omitted_fields() {
        let mut fields = Product::parse_new(&red_shirt_form()).unwrap();
        let patch = Product::parse_patch(
            &FormFields::new()
                .with("price", "1200")
                .with("isBestSelling", "true"),
        )
        .unwrap();
        assert_eq!(Product::patch_title(&patch), None);

        Product::apply(&mut fields, patch);
        assert_eq!(fields.item.title, "Red Shirt");
        assert_eq!(fields.item.price, Price::parse("1200").unwrap());
        assert_eq!(fields.item.sizes, vec!["S", "M"]);
        assert!(fields.is_best_selling);
    }

    #[test]
    fn test_patch_rejects_blank_required_field() {
        let form = FormFields::new().with("title", "   ");
        assert_eq!(
            Feature::parse_patch(&form),
            Err(ValidationError::missing("title"))
        );
    }

    #[test]
    fn test_banner_parse_and_patch() {
        let form = FormFields::new()
            .with("heading", "Summer Sale")
            .with("subheading", "Up to 50% off")
            .with("btnText", "Shop now");
        let mut fields = Trending::parse_new(&form).unwrap();
        assert_eq!(Trending::title(&fields), "Summer Sale");

        let patch = MostSales::parse_patch(&FormFields::new().with("heading", "Winter Sale")).unwrap();
        assert_eq!(MostSales::patch_title(&patch), Some("Winter Sale"));
        MostSales::apply(&mut fields, patch);
        assert_eq!(fields.heading, "Winter Sale");
        assert_eq!(fields.btn_text, "Shop now");

        assert_eq!(
            Trending::parse_new(&FormFields::new().with("heading", "x").with("subheading", "y")),
            Err(ValidationError::missing("btnText"))
        );
    }

    #[test]
    fn test_allows_size() {
        let fields = Product::parse_new(&red_shirt_form()).unwrap().item;
        assert!(fields.allows_size("M"));
        assert!(fields.allows_size(""));
        assert!(!fields.allows_size("XL"));

        let no_sizes = MerchFields {
            sizes: Vec::new(),
            ..fields
        };
        assert!(no_sizes.allows_size("XL"));
    }

    #[test]
    fn test_product_fields_serialize_flat_camel_case() {
        let fields = Product::parse_new(&red_shirt_form()).unwrap();
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["title"], "Red Shirt");
        assert_eq!(json["isBestSelling"], false);
        assert_eq!(json["price"], "1000");
        let back: ProductFields = serde_json::from_value(json).unwrap();
        assert_eq!(back, fields);
    }
}
