//! Cart operations for one signed-in user.
//!
//! Each call loads the user's cart, applies one change through the
//! [`Cart`] aggregate and stores it back. Reads and clears of a cart that
//! was never stored return an empty cart without creating a row.

use marketstall_core::{
    Cart, CatalogItem, CatalogItemId, CatalogKind, LineItemId, LineUpdate, Product, ProductFields,
    Quantity, UserId,
};

use super::ServiceError;
use crate::db::{CartRepository, CatalogRepository};

/// How an add request names its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(CatalogItemId),
    Slug(String),
}

pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
    catalog: &'a dyn CatalogRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository, catalog: &'a dyn CatalogRepository) -> Self {
        Self { carts, catalog }
    }

    fn cart_not_found() -> ServiceError {
        ServiceError::NotFound("Cart not found".to_string())
    }

    async fn product(
        &self,
        reference: &ProductRef,
    ) -> Result<Option<CatalogItem<ProductFields>>, ServiceError> {
        let record = match reference {
            ProductRef::Id(id) => self.catalog.find_by_id(CatalogKind::Product, *id).await?,
            ProductRef::Slug(slug) => {
                self.catalog
                    .find_by_slug(CatalogKind::Product, slug)
                    .await?
            }
        };
        Ok(record.map(|record| record.into_item::<Product>()).transpose()?)
    }

    async fn stored(&self, user: UserId) -> Result<Cart, ServiceError> {
        self.carts
            .find(user)
            .await?
            .ok_or_else(Self::cart_not_found)
    }

    /// Add `qty` of a product in `size`, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product, `Validation` for a size outside the
    /// product's set, otherwise repository failures.
    pub async fn add(
        &self,
        user: UserId,
        reference: &ProductRef,
        qty: Quantity,
        size: &str,
    ) -> Result<Cart, ServiceError> {
        let product = self
            .product(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut cart = self
            .carts
            .find(user)
            .await?
            .unwrap_or_else(|| Cart::empty(user));
        let line = cart.add(&product, size, qty)?;

        let saved = self.carts.save(&cart).await?;
        tracing::debug!(user_id = %user, line_id = %line, product_id = %product.id, "Cart line added");
        Ok(saved)
    }

    /// The stored cart, or an unsaved empty one.
    ///
    /// # Errors
    ///
    /// Returns repository failures.
    pub async fn get(&self, user: UserId) -> Result<Cart, ServiceError> {
        Ok(self
            .carts
            .find(user)
            .await?
            .unwrap_or_else(|| Cart::empty(user)))
    }

    /// Change the quantity and/or size of one line.
    ///
    /// A new size is checked against the product as it is now; if the
    /// product has been deleted the size is taken as given.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing cart or line, `Validation` for a size outside
    /// the product's set.
    pub async fn update_item(
        &self,
        user: UserId,
        line: LineItemId,
        update: LineUpdate,
    ) -> Result<Cart, ServiceError> {
        let mut cart = self.stored(user).await?;
        let product_id = cart
            .line(line)
            .map(|existing| existing.product)
            .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))?;

        let product = if update.size.is_some() {
            self.product(&ProductRef::Id(product_id)).await?
        } else {
            None
        };

        cart.update_line(line, update, product.as_ref().map(|p| &p.fields.item))?;
        Ok(self.carts.save(&cart).await?)
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing cart or line.
    pub async fn remove_item(&self, user: UserId, line: LineItemId) -> Result<Cart, ServiceError> {
        let mut cart = self.stored(user).await?;
        cart.remove_line(line)?;
        Ok(self.carts.save(&cart).await?)
    }

    /// Empty the cart. A user without a stored cart gets an empty one back
    /// and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns repository failures.
    pub async fn clear(&self, user: UserId) -> Result<Cart, ServiceError> {
        let Some(mut cart) = self.carts.find(user).await? else {
            return Ok(Cart::empty(user));
        };
        cart.clear();
        Ok(self.carts.save(&cart).await?)
    }
}
