//! Bearer-token extractors.
//!
//! [`RequireUser`] admits any signed-in account, [`RequireAdmin`] only
//! admins. Both verify the token, then load the account so a deleted user's
//! token stops working immediately.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use marketstall_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::{JwtError, JwtService};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub User);

/// Extractor that requires a valid bearer token for an admin account.
pub struct RequireAdmin(pub User);

/// Why a request was turned away.
#[derive(Debug)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// The token failed verification.
    InvalidToken(JwtError),
    /// The token names an account that no longer exists.
    UnknownUser,
    /// Authenticated, but the role is not allowed.
    Forbidden,
    /// The account lookup failed.
    Lookup(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let err = match self {
            Self::MissingToken => AppError::Unauthorized("No token provided".to_string()),
            Self::InvalidToken(JwtError::ExpiredToken) => {
                AppError::Unauthorized("Token expired".to_string())
            }
            Self::InvalidToken(_) => AppError::Unauthorized("Invalid or expired token".to_string()),
            Self::UnknownUser => AppError::Unauthorized("Invalid token user".to_string()),
            Self::Forbidden => AppError::Forbidden("Forbidden: insufficient role".to_string()),
            Self::Lookup(err) => err,
        };
        err.into_response()
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, AuthRejection> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(JwtService::extract_from_header)
        .ok_or(AuthRejection::MissingToken)?;

    let claims = state
        .jwt()
        .verify(token)
        .map_err(AuthRejection::InvalidToken)?;

    let user = state
        .users()
        .find_by_id(claims.id)
        .await
        .map_err(|e| AuthRejection::Lookup(AppError::Internal(e.to_string())))?
        .ok_or(AuthRejection::UnknownUser)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if user.role != Role::Admin {
            tracing::debug!(user_id = %user.id, role = %user.role, "Admin route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}
