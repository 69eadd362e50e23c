//! Announcement endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::auth::AdminUser;
use crate::dto::{AnnouncementBody, AnnouncementResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Published announcements that are currently visible.
#[utoipa::path(
    get,
    path = "/api/v1/announcements",
    responses(
        (status = 200, description = "Visible announcements, newest first", body = Vec<AnnouncementResponse>),
    ),
    tag = "announcements"
)]
pub async fn list_visible(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnnouncementResponse>>, ApiError> {
    let announcements = state.announcements.list_visible(Utc::now()).await?;
    Ok(Json(announcements.into_iter().map(Into::into).collect()))
}

/// Every announcement, drafts and expired ones included.
#[utoipa::path(
    get,
    path = "/api/v1/announcements/all",
    responses(
        (status = 200, description = "All announcements", body = Vec<AnnouncementResponse>),
        (status = 403, description = "Administrator role required"),
    ),
    tag = "announcements"
)]
pub async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<AnnouncementResponse>>, ApiError> {
    let announcements = state.announcements.list_all().await?;
    Ok(Json(announcements.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/announcements",
    request_body = AnnouncementBody,
    responses(
        (status = 201, description = "Announcement created", body = AnnouncementResponse),
        (status = 400, description = "Invalid announcement"),
    ),
    tag = "announcements"
)]
pub async fn create_announcement(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<AnnouncementBody>,
) -> Result<(StatusCode, Json<AnnouncementResponse>), ApiError> {
    let announcement = state
        .announcements
        .create(&body.into_new()?, admin.id)
        .await?;
    Ok((StatusCode::CREATED, Json(announcement.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/announcements/{id}",
    params(("id" = i64, Path, description = "Announcement id")),
    request_body = AnnouncementBody,
    responses(
        (status = 200, description = "Announcement updated", body = AnnouncementResponse),
        (status = 404, description = "Announcement not found"),
    ),
    tag = "announcements"
)]
pub async fn update_announcement(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<AnnouncementBody>,
) -> Result<Json<AnnouncementResponse>, ApiError> {
    let announcement = state.announcements.update(id, &body.into_new()?).await?;
    Ok(Json(announcement.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/announcements/{id}",
    params(("id" = i64, Path, description = "Announcement id")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 404, description = "Announcement not found"),
    ),
    tag = "announcements"
)]
pub async fn delete_announcement(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.announcements.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
