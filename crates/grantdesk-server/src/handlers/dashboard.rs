//! Dashboard data: request statistics and chart series per role.

use axum::{
    Json,
    extract::{Query, State},
};

use grantdesk_core::{AppError, User, summarize_requests};
use grantdesk_db::RequestFilter;

use crate::auth::{AdminUser, CurrentUser};
use crate::dto::{
    AdminDashboardResponse, MemberDashboardResponse, NamedCount, YearIdQuery, fund_usage,
};
use crate::error::ApiError;
use crate::handlers::funds::load_fund_tree;
use crate::handlers::requests::review_queue;
use crate::state::AppState;

/// Numbers for a teacher, staff or department head dashboard, scoped to the
/// current year when there is one.
pub(crate) async fn member_dashboard(
    state: &AppState,
    user: &User,
) -> Result<MemberDashboardResponse, AppError> {
    let year = state.years.current().await?;
    let year_id = year.as_ref().map(|y| y.id);

    let own_filter = RequestFilter {
        year_id,
        ..RequestFilter::for_user(user.id)
    };
    let requests = summarize_requests(&state.requests.dashboard_rows(&own_filter).await?);

    let department = match (user.role.is_dept_head(), user.department_id) {
        (true, Some(department_id)) => {
            let filter = RequestFilter {
                department_id: Some(department_id),
                year_id,
                ..Default::default()
            };
            Some(summarize_requests(&state.requests.dashboard_rows(&filter).await?).into())
        }
        _ => None,
    };

    let pending_reviews = review_queue(state, user).await?.len();
    let publication_count = state.publications.list_for_user(user.id, None).await?.len();

    Ok(MemberDashboardResponse {
        user: user.clone().into(),
        year: year.map(Into::into),
        requests: requests.into(),
        department,
        pending_reviews,
        publication_count,
    })
}

/// Numbers for the administration dashboard. `year_id` defaults to the
/// current year; without one, requests of every year are counted.
pub(crate) async fn admin_dashboard_data(
    state: &AppState,
    year_id: Option<i64>,
) -> Result<AdminDashboardResponse, AppError> {
    let year = match year_id {
        Some(id) => Some(state.years.require(id).await?),
        None => state.years.current().await?,
    };

    let filter = RequestFilter {
        year_id: year.as_ref().map(|y| y.id),
        ..Default::default()
    };
    let requests = summarize_requests(&state.requests.dashboard_rows(&filter).await?);

    let usage = match &year {
        Some(y) => fund_usage(&load_fund_tree(state, y.id).await?),
        None => Vec::new(),
    };
    let users_by_role = state
        .users
        .count_by_role()
        .await?
        .into_iter()
        .map(NamedCount::from)
        .collect();
    let publications = state.publications.get_stats().await?;

    Ok(AdminDashboardResponse {
        year: year.map(Into::into),
        requests: requests.into(),
        fund_usage: usage,
        users_by_role,
        publications: publications.into(),
    })
}

/// Dashboard data for the caller.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/me",
    responses(
        (status = 200, description = "Own dashboard", body = MemberDashboardResponse),
        (status = 401, description = "Not logged in"),
    ),
    tag = "dashboard"
)]
pub async fn my_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MemberDashboardResponse>, ApiError> {
    Ok(Json(member_dashboard(&state, &user).await?))
}

/// Administration dashboard data.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/admin",
    params(YearIdQuery),
    responses(
        (status = 200, description = "Administration dashboard", body = AdminDashboardResponse),
        (status = 403, description = "Administrator role required"),
    ),
    tag = "dashboard"
)]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<YearIdQuery>,
) -> Result<Json<AdminDashboardResponse>, ApiError> {
    Ok(Json(admin_dashboard_data(&state, query.year_id).await?))
}
