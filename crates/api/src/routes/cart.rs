//! Cart handlers.
//!
//! Every endpoint answers with the whole cart and its totals:
//! `{ success, cart, totalItems, subtotal }`.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use marketstall_core::{Cart, CartTotals, CatalogItemId, LineItemId, LineUpdate, Quantity};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::{CartService, ProductRef, ServiceError};
use crate::state::AppState;

/// Cart plus derived totals.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart: Cart,
    #[serde(flatten)]
    pub totals: CartTotals,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            success: true,
            totals: cart.totals(),
            cart,
        }
    }
}

/// Body of `POST /api/cart/add`.
///
/// `productId` may be a number or a numeric string; `slug` is used when no
/// `productId` is given.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub qty: Option<Value>,
    #[serde(default)]
    pub size: Option<String>,
}

/// Body of `PATCH /api/cart/item/{itemId}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub qty: Option<Value>,
    #[serde(default)]
    pub size: Option<String>,
}

fn product_not_found() -> AppError {
    ServiceError::NotFound("Product not found".to_string()).into()
}

impl AddItemRequest {
    fn product_ref(&self) -> Result<ProductRef> {
        let id = match &self.product_id {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.parse::<CatalogItemId>().map_err(|_| product_not_found())?),
            Some(Value::Number(n)) => Some(
                n.as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .map(CatalogItemId::new)
                    .ok_or_else(product_not_found)?,
            ),
            Some(_) => return Err(product_not_found()),
        };
        if let Some(id) = id {
            return Ok(ProductRef::Id(id));
        }

        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => Ok(ProductRef::Slug(slug.to_string())),
            _ => Err(AppError::BadRequest(
                "productId or slug is required".to_string(),
            )),
        }
    }
}

/// Absent or `null` means "not provided".
fn parse_qty(raw: Option<&Value>) -> Result<Option<Quantity>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Quantity::from_json(value)
            .map(Some)
            .map_err(|e| ServiceError::Validation(e).into()),
    }
}

fn parse_line_id(raw: &str) -> Result<LineItemId> {
    raw.parse()
        .map_err(|_| ServiceError::NotFound("Item not found".to_string()).into())
}

/// GET /api/cart
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn get_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.carts(), state.catalog())
        .get(user.id)
        .await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/add
///
/// # Errors
///
/// 400 without a product reference or with an invalid qty or size, 404 for
/// an unknown product.
pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(request) = payload?;
    let product = request.product_ref()?;
    let qty = parse_qty(request.qty.as_ref())?.unwrap_or(Quantity::ONE);
    let size = request.size.as_deref().map(str::trim).unwrap_or_default();

    let cart = CartService::new(state.carts(), state.catalog())
        .add(user.id, &product, qty, size)
        .await?;
    Ok(Json(cart.into()))
}

/// PATCH /api/cart/item/{itemId}
///
/// # Errors
///
/// 404 for a missing cart or line, 400 for an invalid qty or size.
pub async fn update_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(item_id): Path<String>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(request) = payload?;
    let line = parse_line_id(&item_id)?;
    let update = LineUpdate {
        qty: parse_qty(request.qty.as_ref())?,
        size: request.size.map(|size| size.trim().to_string()),
    };

    let cart = CartService::new(state.carts(), state.catalog())
        .update_item(user.id, line, update)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/cart/item/{itemId}
///
/// # Errors
///
/// 404 for a missing cart or line.
pub async fn remove_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(item_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let line = parse_line_id(&item_id)?;
    let cart = CartService::new(state.carts(), state.catalog())
        .remove_item(user.id, line)
        .await?;
    Ok(Json(cart.into()))
}

/// POST /api/cart/clear
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.carts(), state.catalog())
        .clear(user.id)
        .await?;
    Ok(Json(cart.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> AddItemRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_product_ref_prefers_id() {
        assert_eq!(
            request(json!({"productId": 7, "slug": "red-shirt"}))
                .product_ref()
                .unwrap(),
            ProductRef::Id(CatalogItemId::new(7))
        );
        assert_eq!(
            request(json!({"productId": "7"})).product_ref().unwrap(),
            ProductRef::Id(CatalogItemId::new(7))
        );
        assert_eq!(
            request(json!({"productId": "", "slug": " red-shirt "}))
                .product_ref()
                .unwrap(),
            ProductRef::Slug("red-shirt".to_string())
        );
    }

    #[test]
    fn test_product_ref_required() {
        let err = request(json!({"qty": 1})).product_ref().unwrap_err();
        assert_eq!(err.to_string(), "productId or slug is required");

        let err = request(json!({"productId": "abc"})).product_ref().unwrap_err();
        assert_eq!(err.to_string(), "Product not found");
    }

    #[test]
    fn test_parse_qty() {
        assert_eq!(parse_qty(None).unwrap(), None);
        assert_eq!(parse_qty(Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_qty(Some(&json!("3"))).unwrap().unwrap().get(), 3);
        assert!(parse_qty(Some(&json!(0))).is_err());
        assert!(parse_qty(Some(&json!("abc"))).is_err());
        assert!(parse_qty(Some(&json!(1.5))).is_err());
    }

    #[test]
    fn test_cart_response_flattens_totals() {
        let body = serde_json::to_value(CartResponse::from(Cart::empty(
            marketstall_core::UserId::new(3),
        )))
        .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["totalItems"], 0);
        assert_eq!(body["subtotal"], "0");
        assert!(body["cart"]["items"].as_array().unwrap().is_empty());
    }
}
