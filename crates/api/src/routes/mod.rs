//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness
//! GET    /health/ready             - Readiness (database)
//! GET    /api/health               - {"ok": true}
//!
//! # Auth
//! POST   /api/auth/register        - Create a user account
//! POST   /api/auth/login           - Exchange credentials for a token
//! GET    /api/auth/me              - Current account (token)
//!
//! # Catalog (<kind> = product | trending | most-sales | features)
//! POST   /api/<kind>               - Create, multipart (admin)
//! GET    /api/<kind>               - List (product: ?page&limit&bestSelling)
//! GET    /api/<kind>/{slug}        - Detail
//! PUT    /api/<kind>/{slug}        - Partial update, multipart (admin)
//! DELETE /api/<kind>/{slug}        - Delete (admin)
//!
//! # Cart (token)
//! GET    /api/cart                 - Current cart
//! POST   /api/cart/add             - Add a product
//! PATCH  /api/cart/item/{itemId}   - Change qty and/or size
//! DELETE /api/cart/item/{itemId}   - Remove a line
//! POST   /api/cart/clear           - Empty the cart
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use serde::Serialize;

use marketstall_core::{CatalogSchema, Feature, MostSales, Product, Trending};

use crate::assets::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for the text fields sent next to the image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// The `{ success, message?, data? }` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Everything under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::api_health))
        .nest("/auth", auth_routes())
        .nest("/cart", cart_routes())
        .merge(catalog_routes::<Product>())
        .merge(catalog_routes::<Trending>())
        .merge(catalog_routes::<MostSales>())
        .merge(catalog_routes::<Feature>())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get_cart))
        .route("/add", post(cart::add_item))
        .route(
            "/item/{item_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/clear", post(cart::clear_cart))
}

/// Routes for one catalog kind, mounted at `/<segment>`.
pub fn catalog_routes<S: CatalogSchema>() -> Router<AppState> {
    let base = format!("/{}", S::KIND.route_segment());
    let item = format!("{base}/{{slug}}");

    Router::new()
        .route(&base, get(catalog::list::<S>).post(catalog::create::<S>))
        .route(
            &item,
            get(catalog::get_one::<S>)
                .put(catalog::update::<S>)
                .delete(catalog::remove::<S>),
        )
        .layer(DefaultBodyLimit::max(
            MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
}
