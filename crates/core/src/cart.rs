//! The cart aggregate.
//!
//! One cart per user, holding an ordered list of line items. A line is
//! identified for merging by `(product, size)`: adding the same product in
//! the same size bumps the existing line's quantity, anything else appends a
//! new line. Title, image, price and slug are copied from the product when the
//! line is created and never follow later product edits.
//!
//! Totals are derived from the current lines on every read and never stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogItem, MerchFields, ProductFields};
use crate::types::{CatalogItemId, LineItemId, Price, Quantity, Slug, UserId};
use crate::validation::ValidationError;

/// Errors from mutating an existing cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found")]
    LineNotFound,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// One entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: LineItemId,
    /// The product this line refers to. The cart does not own it.
    pub product: CatalogItemId,
    pub slug: Slug,
    pub title: String,
    pub image_url: String,
    pub price: Price,
    /// Chosen size, `""` when none.
    #[serde(default)]
    pub size: String,
    pub qty: Quantity,
}

impl LineItem {
    /// `qty × price` for this line, `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(self.qty.get())
    }
}

/// Product values captured into a new line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub product: CatalogItemId,
    pub slug: Slug,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

impl From<&CatalogItem<ProductFields>> for ProductSnapshot {
    fn from(item: &CatalogItem<ProductFields>) -> Self {
        Self {
            product: item.id,
            slug: item.slug.clone(),
            title: item.fields.item.title.clone(),
            image_url: item.image.image_url.clone(),
            price: item.fields.item.price,
        }
    }
}

/// Requested change to an existing line. `None` leaves the value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineUpdate {
    pub qty: Option<Quantity>,
    pub size: Option<String>,
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_items: u64,
    pub subtotal: Decimal,
}

/// Sum quantities and `qty × price` over `items`.
///
/// Saturates at `Decimal::MAX`. Carts mutated through [`Cart`] never get
/// there; see [`checked_totals`].
#[must_use]
pub fn compute_totals(items: &[LineItem]) -> CartTotals {
    items.iter().fold(CartTotals::default(), |acc, line| CartTotals {
        total_items: acc.total_items.saturating_add(u64::from(line.qty.get())),
        subtotal: acc
            .subtotal
            .saturating_add(line.line_total().unwrap_or(Decimal::MAX)),
    })
}

/// Like [`compute_totals`], but fails instead of saturating.
///
/// # Errors
///
/// Returns `ValidationError::Invalid` when a line total or the subtotal
/// overflows.
pub fn checked_totals(items: &[LineItem]) -> Result<CartTotals, ValidationError> {
    let too_large = || ValidationError::invalid("qty", "makes the cart total too large");
    items.iter().try_fold(CartTotals::default(), |acc, line| {
        let line_total = line.line_total().ok_or_else(too_large)?;
        Ok(CartTotals {
            total_items: acc.total_items + u64::from(line.qty.get()),
            subtotal: acc.subtotal.checked_add(line_total).ok_or_else(too_large)?,
        })
    })
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user: UserId,
    pub items: Vec<LineItem>,
    /// Unset on a cart that has never been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// A cart with no lines that has not been stored.
    #[must_use]
    pub const fn empty(user: UserId) -> Self {
        Self {
            user,
            items: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        compute_totals(&self.items)
    }

    #[must_use]
    pub fn line(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Add `qty` of `product` in `size`, merging into an existing
    /// `(product, size)` line when there is one.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidSize` when the product is sized and
    /// `size` is not one of its sizes, or an overflow error when the quantity
    /// or the cart total would no longer fit. The cart is unchanged on error.
    pub fn add(
        &mut self,
        product: &CatalogItem<ProductFields>,
        size: &str,
        qty: Quantity,
    ) -> Result<LineItemId, ValidationError> {
        if !product.fields.item.allows_size(size) {
            return Err(ValidationError::InvalidSize);
        }

        let mut items = self.items.clone();
        let id = Self::merge_into(&mut items, product, size, qty)?;
        checked_totals(&items)?;
        self.items = items;
        Ok(id)
    }

    fn merge_into(
        items: &mut Vec<LineItem>,
        product: &CatalogItem<ProductFields>,
        size: &str,
        qty: Quantity,
    ) -> Result<LineItemId, ValidationError> {
        if let Some(line) = items
            .iter_mut()
            .find(|line| line.product == product.id && line.size == size)
        {
            line.qty = line.qty.checked_add(qty)?;
            return Ok(line.id);
        }

        let snapshot = ProductSnapshot::from(product);
        let id = LineItemId::generate();
        items.push(LineItem {
            id,
            product: snapshot.product,
            slug: snapshot.slug,
            title: snapshot.title,
            image_url: snapshot.image_url,
            price: snapshot.price,
            size: size.to_string(),
            qty,
        });
        Ok(id)
    }

    /// Apply `update` to line `id`. Nothing changes unless every part of the
    /// update is valid.
    ///
    /// `product` is the line's product as it is now; when it is gone the size
    /// is accepted unchecked.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` for an unknown line and
    /// `CartError::Invalid` for a size outside the product's set or a
    /// quantity that overflows the cart total.
    pub fn update_line(
        &mut self,
        id: LineItemId,
        update: LineUpdate,
        product: Option<&MerchFields>,
    ) -> Result<(), CartError> {
        let mut items = self.items.clone();
        let line = items
            .iter_mut()
            .find(|line| line.id == id)
            .ok_or(CartError::LineNotFound)?;

        if let (Some(size), Some(product)) = (update.size.as_deref(), product)
            && !product.allows_size(size)
        {
            return Err(ValidationError::InvalidSize.into());
        }

        if let Some(qty) = update.qty {
            line.qty = qty;
        }
        if let Some(size) = update.size {
            line.size = size;
        }
        checked_totals(&items)?;
        self.items = items;
        Ok(())
    }

    /// Remove line `id`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` for an unknown line.
    pub fn remove_line(&mut self, id: LineItemId) -> Result<LineItem, CartError> {
        let index = self
            .items
            .iter()
            .position(|line| line.id == id)
            .ok_or(CartError::LineNotFound)?;
        Ok(self.items.remove(index))
    }

    /// Drop every line. The cart itself stays.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::catalog::{CatalogSchema, FormFields, ImageRef, Product};

    fn product(id: i32, title: &str, price: &str, sizes: &str) -> CatalogItem<ProductFields> {
        let form = FormFields::new()
            .with("title", title)
            .with("price", price)
            .with("sizes", sizes)
            .with("description", "test product");
        CatalogItem {
            id: CatalogItemId::new(id),
            slug: Slug::derive(title, "product"),
            fields: Product::parse_new(&form).unwrap(),
            image: ImageRef {
                image_name: format!("{id}.png"),
                image_url: format!("http://localhost/uploads/{id}.png"),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_same_product_and_size_merges() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));

        let first = cart.add(&shirt, "M", Quantity::ONE).unwrap();
        let second = cart.add(&shirt, "M", Quantity::ONE).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].qty.get(), 2);
    }

    #[test]
    fn test_add_different_sizes_creates_distinct_lines() {
        let shirt = product(1, "Red Shirt", "1000", "S,M,L");
        let mut cart = Cart::empty(UserId::new(7));

        cart.add(&shirt, "M", Quantity::ONE).unwrap();
        cart.add(&shirt, "L", Quantity::ONE).unwrap();
        cart.add(&shirt, "", Quantity::ONE).unwrap();

        assert_eq!(cart.items.len(), 3);
    }

    #[test]
    fn test_add_rejects_unknown_size() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));

        assert_eq!(
            cart.add(&shirt, "XL", Quantity::ONE),
            Err(ValidationError::InvalidSize)
        );
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_add_snapshots_product_values() {
        let mut shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));
        cart.add(&shirt, "M", qty(2)).unwrap();

        shirt.fields.item.price = Price::parse("1500").unwrap();
        shirt.fields.item.title = "Crimson Shirt".to_string();

        let line = &cart.items[0];
        assert_eq!(line.title, "Red Shirt");
        assert_eq!(line.price, Price::parse("1000").unwrap());
        assert_eq!(line.slug.as_str(), "red-shirt");
        assert_eq!(cart.totals().subtotal, Decimal::from(2000));
    }

    #[test]
    fn test_compute_totals() {
        let a = product(1, "A", "500", "");
        let b = product(2, "B", "1200", "");
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(&a, "", qty(2)).unwrap();
        cart.add(&b, "", qty(1)).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.total_items, 3);
        assert_eq!(totals.subtotal, Decimal::from(2200));
    }

    const MAX_PRICE: &str = "79228162514264337593543950335";

    #[test]
    fn test_add_rejects_total_overflow() {
        let vault = product(1, "Vault", MAX_PRICE, "");
        let mut cart = Cart::empty(UserId::new(1));

        assert!(cart.add(&vault, "", qty(2)).is_err());
        assert!(cart.items.is_empty());

        cart.add(&vault, "", Quantity::ONE).unwrap();
        assert!(cart.add(&vault, "", Quantity::ONE).is_err());
        assert!(cart.add(&product(2, "Sock", "1", ""), "", Quantity::ONE).is_err());
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].qty.get(), 1);
        assert_eq!(cart.totals().subtotal, Decimal::MAX);
    }

    #[test]
    fn test_update_line_rejects_total_overflow() {
        let vault = product(1, "Vault", MAX_PRICE, "S,M");
        let mut cart = Cart::empty(UserId::new(1));
        let id = cart.add(&vault, "S", Quantity::ONE).unwrap();

        let result = cart.update_line(
            id,
            LineUpdate {
                qty: Some(qty(3)),
                size: Some("M".to_string()),
            },
            Some(&vault.fields.item),
        );

        assert!(matches!(result, Err(CartError::Invalid(_))));
        let line = cart.line(id).unwrap();
        assert_eq!(line.qty.get(), 1);
        assert_eq!(line.size, "S");
    }

    #[test]
    fn test_compute_totals_saturates() {
        let vault = product(1, "Vault", MAX_PRICE, "");
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(&vault, "", Quantity::ONE).unwrap();
        // Stored data that bypassed the aggregate.
        cart.items[0].qty = qty(5);

        assert!(checked_totals(&cart.items).is_err());
        assert_eq!(cart.totals().subtotal, Decimal::MAX);
        assert_eq!(cart.totals().total_items, 5);
    }

    #[test]
    fn test_empty_totals_are_zero() {
        assert_eq!(Cart::empty(UserId::new(1)).totals(), CartTotals::default());
    }

    #[test]
    fn test_update_line_qty_and_size() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));
        let id = cart.add(&shirt, "S", Quantity::ONE).unwrap();

        cart.update_line(
            id,
            LineUpdate {
                qty: Some(qty(4)),
                size: Some("M".to_string()),
            },
            Some(&shirt.fields.item),
        )
        .unwrap();

        let line = cart.line(id).unwrap();
        assert_eq!(line.qty.get(), 4);
        assert_eq!(line.size, "M");
    }

    #[test]
    fn test_update_line_invalid_size_changes_nothing() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));
        let id = cart.add(&shirt, "S", Quantity::ONE).unwrap();

        let result = cart.update_line(
            id,
            LineUpdate {
                qty: Some(qty(9)),
                size: Some("XXL".to_string()),
            },
            Some(&shirt.fields.item),
        );

        assert_eq!(result, Err(CartError::Invalid(ValidationError::InvalidSize)));
        let line = cart.line(id).unwrap();
        assert_eq!(line.qty.get(), 1);
        assert_eq!(line.size, "S");
    }

    #[test]
    fn test_update_line_without_product_accepts_size() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(7));
        let id = cart.add(&shirt, "S", Quantity::ONE).unwrap();

        cart.update_line(
            id,
            LineUpdate {
                qty: None,
                size: Some("XXL".to_string()),
            },
            None,
        )
        .unwrap();
        assert_eq!(cart.line(id).unwrap().size, "XXL");
    }

    #[test]
    fn test_update_and_remove_unknown_line() {
        let mut cart = Cart::empty(UserId::new(7));
        let missing = LineItemId::generate();
        assert_eq!(
            cart.update_line(missing, LineUpdate::default(), None),
            Err(CartError::LineNotFound)
        );
        assert_eq!(cart.remove_line(missing), Err(CartError::LineNotFound));
    }

    #[test]
    fn test_remove_and_clear() {
        let a = product(1, "A", "500", "");
        let b = product(2, "B", "1200", "");
        let mut cart = Cart::empty(UserId::new(1));
        let first = cart.add(&a, "", Quantity::ONE).unwrap();
        cart.add(&b, "", Quantity::ONE).unwrap();

        let removed = cart.remove_line(first).unwrap();
        assert_eq!(removed.title, "A");
        assert_eq!(cart.items.len(), 1);

        cart.clear();
        assert!(cart.items.is_empty());
        assert_eq!(cart.totals(), CartTotals::default());
    }

    #[test]
    fn test_cart_serializes_camel_case() {
        let shirt = product(1, "Red Shirt", "1000", "S,M");
        let mut cart = Cart::empty(UserId::new(3));
        cart.add(&shirt, "M", Quantity::ONE).unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["user"], 3);
        assert_eq!(json["items"][0]["imageUrl"], "http://localhost/uploads/1.png");
        assert_eq!(json["items"][0]["qty"], 1);
        assert!(json.get("createdAt").is_none());
    }
}
