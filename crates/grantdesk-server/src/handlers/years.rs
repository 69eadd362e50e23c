//! Budget year endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::{AdminUser, CurrentUser};
use crate::dto::{YearBody, YearResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// List budget years, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/years",
    responses(
        (status = 200, description = "Budget years", body = Vec<YearResponse>),
        (status = 401, description = "Not logged in"),
    ),
    tag = "years"
)]
pub async fn list_years(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<YearResponse>>, ApiError> {
    let years = state.years.list().await?;
    Ok(Json(years.into_iter().map(Into::into).collect()))
}

/// Create a budget year.
#[utoipa::path(
    post,
    path = "/api/v1/years",
    request_body = YearBody,
    responses(
        (status = 201, description = "Year created", body = YearResponse),
        (status = 400, description = "Invalid year"),
        (status = 409, description = "Year already exists"),
    ),
    tag = "years"
)]
pub async fn create_year(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<YearBody>,
) -> Result<(StatusCode, Json<YearResponse>), ApiError> {
    let year = state.years.create(&body.into_new()?).await?;
    tracing::info!(admin_id = admin.id, year = year.year, "Budget year created");
    Ok((StatusCode::CREATED, Json(year.into())))
}

/// Update a budget year.
#[utoipa::path(
    put,
    path = "/api/v1/years/{id}",
    params(("id" = i64, Path, description = "Year id")),
    request_body = YearBody,
    responses(
        (status = 200, description = "Year updated", body = YearResponse),
        (status = 404, description = "Year not found"),
    ),
    tag = "years"
)]
pub async fn update_year(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<YearBody>,
) -> Result<Json<YearResponse>, ApiError> {
    let year = state.years.update(id, &body.into_new()?).await?;
    Ok(Json(year.into()))
}

/// Delete a budget year that has no funds or requests.
#[utoipa::path(
    delete,
    path = "/api/v1/years/{id}",
    params(("id" = i64, Path, description = "Year id")),
    responses(
        (status = 204, description = "Year deleted"),
        (status = 404, description = "Year not found"),
        (status = 409, description = "Year is still referenced"),
    ),
    tag = "years"
)]
pub async fn delete_year(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.years.delete(id).await?;
    tracing::info!(admin_id = admin.id, year_id = id, "Budget year deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Make a year the current one. Any previously current year is cleared.
#[utoipa::path(
    post,
    path = "/api/v1/years/{id}/current",
    params(("id" = i64, Path, description = "Year id")),
    responses(
        (status = 200, description = "Year is now current", body = YearResponse),
        (status = 404, description = "Year not found"),
    ),
    tag = "years"
)]
pub async fn set_current_year(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<YearResponse>, ApiError> {
    let year = state.years.set_current(id).await?;
    tracing::info!(admin_id = admin.id, year = year.year, "Current budget year changed");
    Ok(Json(year.into()))
}
