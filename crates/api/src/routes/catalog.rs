//! Catalog handlers, generic over the record kind.
//!
//! Writes arrive as `multipart/form-data`: text fields plus an optional
//! `image` file part. Reads are public; writes need an admin token.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use marketstall_core::{CatalogItem, CatalogSchema, FormFields};

use super::ApiResponse;
use crate::assets::{self, Upload};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::{CatalogService, ListParams, Pagination, ServiceError};
use crate::state::AppState;

/// Name of the multipart file part.
const IMAGE_FIELD: &str = "image";

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub best_selling: Option<String>,
}

/// Listing body: items plus pagination for paginated kinds.
#[derive(Debug, Serialize)]
pub struct ListResponse<F> {
    pub success: bool,
    pub data: Vec<CatalogItem<F>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

type ItemResponse<S> = Json<ApiResponse<CatalogItem<<S as CatalogSchema>::Fields>>>;

/// Split a multipart body into text fields and the image part.
///
/// An empty file part counts as no image.
async fn read_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(FormFields, Option<Upload>)> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut form = FormFields::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            if bytes.is_empty() || image.is_some() {
                continue;
            }
            image = Some(
                Upload::new(file_name, content_type, bytes).map_err(ServiceError::Validation)?,
            );
        } else {
            form.push(&name, field.text().await?);
        }
    }

    Ok((form, image))
}

/// POST /api/<kind>
///
/// # Errors
///
/// 400 for invalid fields or image, 409 for a duplicate, 401/403 without an
/// admin token.
pub async fn create<S: CatalogSchema>(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, ItemResponse<S>)> {
    let (form, image) = read_form(multipart).await?;
    let origin = assets::request_origin(&headers, &state.config().base_url);

    let item = CatalogService::<S>::new(state.catalog(), state.assets())
        .create(&form, image, &origin)
        .await?;

    tracing::debug!(admin_id = %admin.id, slug = %item.slug, "Create handled");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            format!("{} created", S::KIND.label()),
            Some(item),
        )),
    ))
}

/// GET /api/<kind>
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn list<S: CatalogSchema>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<S::Fields>>> {
    let params = ListParams {
        page: query.page,
        limit: query.limit,
        flag: query.best_selling,
    };
    let listing = CatalogService::<S>::new(state.catalog(), state.assets())
        .list(&params)
        .await?;

    Ok(Json(ListResponse {
        success: true,
        data: listing.items,
        pagination: listing.pagination,
    }))
}

/// GET /api/<kind>/{slug}
///
/// # Errors
///
/// 404 when no record holds the slug.
pub async fn get_one<S: CatalogSchema>(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ItemResponse<S>> {
    let item = CatalogService::<S>::new(state.catalog(), state.assets())
        .get(&slug)
        .await?;
    Ok(Json(ApiResponse::data(item)))
}

/// PUT /api/<kind>/{slug}
///
/// # Errors
///
/// 404 for an unknown slug, 400 for invalid fields, 409 for a duplicate.
pub async fn update<S: CatalogSchema>(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(slug): Path<String>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ItemResponse<S>> {
    let (form, image) = read_form(multipart).await?;
    let origin = assets::request_origin(&headers, &state.config().base_url);

    let item = CatalogService::<S>::new(state.catalog(), state.assets())
        .update(&slug, &form, image, &origin)
        .await?;

    Ok(Json(ApiResponse::with_message(
        format!("{} updated", S::KIND.label()),
        Some(item),
    )))
}

/// DELETE /api/<kind>/{slug}
///
/// # Errors
///
/// 404 for an unknown slug.
pub async fn remove<S: CatalogSchema>(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    CatalogService::<S>::new(state.catalog(), state.assets())
        .delete(&slug)
        .await?;

    Ok(Json(ApiResponse::with_message(
        format!("{} deleted", S::KIND.label()),
        None,
    )))
}
