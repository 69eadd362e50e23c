//! Cookie sessions, role guards and the page gate.
//!
//! The session cookie carries a random token; the database only knows its
//! SHA-256. API handlers declare the access they need through the
//! [`CurrentUser`], [`ReviewerUser`], [`AdminUser`] and [`SuperAdminUser`]
//! extractors, which answer with JSON 401/403. Server-rendered pages sit
//! behind [`require_page_session`], which redirects to the login form
//! instead.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time;
use tower_cookies::{Cookie, Cookies};

use grantdesk_core::auth::{generate_session_token, hash_session_token, verify_password};
use grantdesk_core::{Actor, AppError, User};

use crate::error::ApiError;
use crate::pages;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "grantdesk_session";

/// The logged-in user of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        actor_of(&self.0)
    }
}

pub fn actor_of(user: &User) -> Actor {
    Actor {
        user_id: user.id,
        role: user.role,
        department_id: user.department_id,
    }
}

/// Resolves the session cookie to an active user.
pub async fn session_user(state: &AppState, cookies: &Cookies) -> Result<Option<User>, AppError> {
    let Some(cookie) = cookies.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let token_hash = hash_session_token(cookie.value());
    state.sessions.find_user_by_token(&token_hash, Utc::now()).await
}

/// Checks credentials. Unknown emails, wrong passwords and inactive accounts
/// all yield `Unauthorized`.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let user = state.users.find_by_email(email).await?;
    match user {
        Some(user) if user.active && verify_password(password, &user.password_hash) => Ok(user),
        Some(user) => {
            tracing::warn!(user_id = user.id, active = user.active, "Login rejected");
            Err(AppError::Unauthorized)
        }
        None => {
            tracing::warn!("Login rejected for unknown email");
            Err(AppError::Unauthorized)
        }
    }
}

/// Creates a session for `user` and sets the cookie.
pub async fn start_session(state: &AppState, cookies: &Cookies, user: &User) -> Result<(), AppError> {
    let token = generate_session_token();
    let expires_at = Utc::now() + state.session_ttl;
    state
        .sessions
        .create(&hash_session_token(&token), user.id, expires_at)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(time::Duration::seconds(state.session_ttl.num_seconds()))
        .build();
    cookies.add(cookie);

    tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");
    Ok(())
}

/// Deletes the current session, if any, and clears the cookie.
pub async fn end_session(state: &AppState, cookies: &Cookies) -> Result<(), AppError> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state
            .sessions
            .delete(&hash_session_token(cookie.value()))
            .await?;
    }
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    Ok(())
}

/// Accepts only local redirect targets.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

/// Percent-encodes a path for the `next` query parameter.
pub fn encode_next(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for b in path.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

// ===== Extractors =====

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(msg.to_string()))?;
        let user = session_user(state, &cookies)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        let current = CurrentUser(user);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Department heads and administrators.
#[derive(Debug, Clone)]
pub struct ReviewerUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ReviewerUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role.is_dept_head() || user.role.can_access_admin() {
            Ok(ReviewerUser(user))
        } else {
            Err(ApiError::Forbidden("reviewer role required".to_string()))
        }
    }
}

/// Admin and superadmin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role.can_access_admin() {
            Ok(AdminUser(user))
        } else {
            Err(ApiError::Forbidden("administrator role required".to_string()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuperAdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SuperAdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role.can_manage_users() {
            Ok(SuperAdminUser(user))
        } else {
            Err(ApiError::Forbidden("superadmin role required".to_string()))
        }
    }
}

// ===== Page gate =====

/// Middleware for server-rendered pages under `/dashboard` and `/admin`.
///
/// - No valid session: 303 to `/login?next=<original path>`.
/// - `/admin` pages for a non-admin role: 403 page.
///
/// The resolved user is stored in the request extensions for the page
/// handlers.
pub async fn require_page_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let user = match session_user(&state, &cookies).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            let location = format!("/login?next={}", encode_next(&target));
            return Redirect::to(&location).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Session lookup failed");
            return pages::error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "The portal is temporarily unavailable.",
            );
        }
    };

    if request.uri().path().starts_with("/admin") && !user.role.can_access_admin() {
        tracing::warn!(user_id = user.id, path = %target, "Admin page refused");
        return pages::error_page(
            StatusCode::FORBIDDEN,
            "Your account does not have access to the administration pages.",
        );
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}
