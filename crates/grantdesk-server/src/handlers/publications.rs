//! Publication endpoints: listing, PDF summaries and Scopus / Scholar imports.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use grantdesk_core::{
    AppError, BatchImportSummary, ImportService, ImportTarget, SummaryRequest, TracingReporter,
    User, UserImportResult,
};

use crate::auth::{AdminUser, CurrentUser};
use crate::dto::{
    ImportRequest, ImportResponse, ImportRunResponse, ImportRunsQuery, MAX_IMPORT_RUNS_LIMIT,
    PublicationQuery, PublicationResponse, SummaryQuery,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Renders the publication summary of `user` for `year` as PDF bytes.
pub(crate) async fn render_summary(
    state: &AppState,
    user: &User,
    year: i32,
) -> Result<Vec<u8>, AppError> {
    let service = state.summary_service.as_ref().ok_or_else(|| {
        AppError::ConfigError("no summary template configured (SUMMARY_TEMPLATE)".to_string())
    })?;

    let department = match user.department_id {
        Some(id) => state.users.get_department(id).await?.map(|d| d.name),
        None => None,
    };
    let publications = state.publications.list_for_user(user.id, Some(year)).await?;

    service
        .generate(&SummaryRequest {
            user,
            department: department.as_deref(),
            year,
            publications: &publications,
        })
        .await
}

fn pdf_response(user: &User, year: i32, pdf: Vec<u8>) -> Response {
    let filename = format!("publications-{}-{}.pdf", user.id, year);
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    )
        .into_response()
}

/// The caller's publications.
#[utoipa::path(
    get,
    path = "/api/v1/publications",
    params(PublicationQuery),
    responses(
        (status = 200, description = "Own publications, newest first", body = Vec<PublicationResponse>),
        (status = 401, description = "Not logged in"),
    ),
    tag = "publications"
)]
pub async fn list_publications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PublicationQuery>,
) -> Result<Json<Vec<PublicationResponse>>, ApiError> {
    let publications = state.publications.list_for_user(user.id, query.year).await?;
    Ok(Json(publications.into_iter().map(Into::into).collect()))
}

/// Remove one of the caller's publications.
#[utoipa::path(
    delete,
    path = "/api/v1/publications/{id}",
    params(("id" = i64, Path, description = "Publication id")),
    responses(
        (status = 204, description = "Publication deleted"),
        (status = 404, description = "Publication not found"),
    ),
    tag = "publications"
)]
pub async fn delete_publication(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.publications.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate the caller's publication summary for a year as PDF.
#[utoipa::path(
    post,
    path = "/api/v1/publications/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 500, description = "Document generation failed"),
        (status = 503, description = "No summary template configured"),
    ),
    tag = "publications"
)]
pub async fn my_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    let pdf = render_summary(&state, &user, query.year).await?;
    Ok(pdf_response(&user, query.year, pdf))
}

/// Generate the publication summary of any user.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/summary",
    params(("id" = i64, Path, description = "User id"), SummaryQuery),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "User not found"),
        (status = 503, description = "No summary template configured"),
    ),
    tag = "publications"
)]
pub async fn user_summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    let user = state.users.require(id).await?;
    let pdf = render_summary(&state, &user, query.year).await?;
    Ok(pdf_response(&user, query.year, pdf))
}

/// Import publications from Scopus or Google Scholar.
///
/// With `user_id`, imports that user and fails when the import fails.
/// Without it, imports every active user that has an author id for the
/// source; per-user failures are reported in the results.
#[utoipa::path(
    post,
    path = "/api/v1/publications/import",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Import finished", body = ImportResponse),
        (status = 400, description = "Unknown source or user without author id"),
        (status = 503, description = "Source not configured or unreachable"),
    ),
    tag = "publications"
)]
pub async fn trigger_import(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    let source = body.source()?;
    let fetcher = state.fetchers.for_source(source)?;
    let service =
        ImportService::with_config(state.publications.clone(), fetcher, state.import_config.clone());

    tracing::info!(
        admin_id = admin.id,
        source = source.as_str(),
        user_id = ?body.user_id,
        "Publication import requested"
    );

    let summary = match body.user_id {
        Some(user_id) => {
            let user = state.users.require(user_id).await?;
            let author_id = user.author_id_for(source).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "user {} has no {} author id",
                    user.id,
                    source.as_str()
                ))
            })?;
            let stats = service
                .import_for_user_with_progress(user.id, author_id, &TracingReporter)
                .await?;

            let mut summary = BatchImportSummary::new();
            summary.add(UserImportResult::success(user.id, user.email.clone(), stats));
            summary
        }
        None => {
            let users = state.users.list_with_author_ids(source).await?;
            let targets: Vec<ImportTarget> = users
                .iter()
                .filter_map(|u| {
                    u.author_id_for(source).map(|author_id| ImportTarget {
                        user_id: u.id,
                        author_id: author_id.to_string(),
                        label: u.email.clone(),
                    })
                })
                .collect();
            service
                .batch_import_with_progress(&targets, &TracingReporter)
                .await
        }
    };

    Ok(Json(ImportResponse::from_summary(source.as_str(), summary)))
}

/// Latest import runs.
#[utoipa::path(
    get,
    path = "/api/v1/publications/imports",
    params(ImportRunsQuery),
    responses(
        (status = 200, description = "Import runs, newest first", body = Vec<ImportRunResponse>),
        (status = 403, description = "Administrator role required"),
    ),
    tag = "publications"
)]
pub async fn list_import_runs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ImportRunsQuery>,
) -> Result<Json<Vec<ImportRunResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_IMPORT_RUNS_LIMIT);
    let runs = state.publications.recent_runs(query.user_id, limit).await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}
