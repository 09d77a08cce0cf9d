//! Account handlers: register, login, me.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::User;
use crate::services::auth::{AuthService, Session};
use crate::state::AppState;

/// Credentials for register and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A token and the account it was issued for.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub token: String,
    pub user: User,
}

impl From<Session> for SessionBody {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.user,
        }
    }
}

/// POST /api/auth/register
///
/// # Errors
///
/// 400 for an invalid email or short password, 409 if the email is taken.
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SessionBody>>)> {
    let Json(credentials) = payload?;
    let session = AuthService::new(state.users(), state.jwt())
        .register(&credentials.email, &credentials.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Account created",
            Some(session.into()),
        )),
    ))
}

/// POST /api/auth/login
///
/// # Errors
///
/// 401 "Invalid credentials" for any unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<ApiResponse<SessionBody>>> {
    let Json(credentials) = payload?;
    let session = AuthService::new(state.users(), state.jwt())
        .login(&credentials.email, &credentials.password)
        .await?;

    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(Json(ApiResponse::data(session.into())))
}

/// GET /api/auth/me
pub async fn me(RequireUser(user): RequireUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::data(user))
}
