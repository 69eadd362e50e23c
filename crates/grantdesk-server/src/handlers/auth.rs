//! Login, logout and the current user.

use axum::{Json, extract::State, http::StatusCode};
use tower_cookies::Cookies;

use crate::auth::{CurrentUser, authenticate, end_session, start_session};
use crate::dto::{LoginRequest, LoginResponse, UserResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Log in with email and password.
///
/// Sets the session cookie on success.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = authenticate(&state, &body.email, &body.password).await?;
    start_session(&state, &cookies, &user).await?;

    Ok(Json(LoginResponse {
        dashboard: user.role.dashboard_path().to_string(),
        user: user.into(),
    }))
}

/// End the current session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Logged out"),
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<StatusCode, ApiError> {
    end_session(&state, &cookies).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not logged in"),
    ),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
