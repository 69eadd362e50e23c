//! Server-rendered pages.
//!
//! Every page is an askama template fed with display-ready rows: amounts,
//! dates and labels are formatted here, and chart data is embedded as a JSON
//! document the page script reads.

use std::collections::HashMap;

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use grantdesk_core::{
    AppError, FundCategoryView, FundRequest, PublicationSource, RequestStatus, Role, User,
    filter_for_role,
};
use grantdesk_db::RequestFilter;

use crate::auth::{CurrentUser, authenticate, end_session, safe_next, session_user, start_session};
use crate::dto::{
    AdminDashboardResponse, LoginForm, LoginPageQuery, MemberDashboardResponse, YearIdQuery,
};
use crate::error::ApiError;
use crate::handlers::dashboard::{admin_dashboard_data, member_dashboard};
use crate::handlers::funds::{load_fund_tree, resolve_year};
use crate::handlers::requests::review_queue;
use crate::state::AppState;

// =============================================================================
// Errors and formatting
// =============================================================================

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    reason: &'a str,
    message: &'a str,
}

/// Renders the generic error page.
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let tmpl = ErrorTemplate {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error"),
        message,
    };
    match tmpl.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Error page rendering failed");
            (status, message.to_string()).into_response()
        }
    }
}

/// Error returned by page handlers, rendered as HTML.
#[derive(Debug)]
pub struct PageError(ApiError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err.into())
    }
}

impl From<askama::Error> for PageError {
    fn from(err: askama::Error) -> Self {
        PageError(ApiError::Internal(format!("template error: {}", err)))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let message = match &self.0 {
            ApiError::Internal(_) => "Something went wrong. Please try again later.".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Page failed");
        }
        error_page(status, &message)
    }
}

type PageResult = Result<Response, PageError>;

fn render<T: Template>(tmpl: T) -> PageResult {
    Ok(Html(tmpl.render()?).into_response())
}

/// Formats a whole-unit amount with thousands separators.
fn fmt_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn fmt_limit(amount: Option<i64>) -> String {
    amount.map_or_else(|| "unlimited".to_string(), fmt_amount)
}

fn fmt_date(date: Option<DateTime<Utc>>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// Human label for a status or role string.
fn label(value: &str) -> String {
    let text = value.replace('_', " ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Teacher => "Teacher",
        Role::Staff => "Staff",
        Role::DeptHead => "Department head",
        Role::Admin => "Administrator",
        Role::SuperAdmin => "Superadmin",
    }
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, PageError> {
    let json = serde_json::to_string(value).map_err(AppError::from)?;
    Ok(json.replace('<', "\\u003c"))
}

// =============================================================================
// Rows
// =============================================================================

struct RequestRow {
    id: i64,
    title: String,
    fund: String,
    applicant: String,
    requested: String,
    approved: String,
    status: String,
    status_class: &'static str,
    submitted: String,
}

fn status_class(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Approved => "ok",
        RequestStatus::Rejected | RequestStatus::Withdrawn => "muted",
        RequestStatus::RevisionRequested => "warn",
        RequestStatus::Submitted | RequestStatus::DeptApproved => "pending",
        RequestStatus::Draft => "draft",
    }
}

fn subcategory_names(tree: &[FundCategoryView]) -> HashMap<i64, String> {
    tree.iter()
        .flat_map(|cat| {
            cat.subcategories
                .iter()
                .map(move |sub| (sub.id, format!("{} / {}", cat.name, sub.name)))
        })
        .collect()
}

fn request_rows(
    requests: Vec<FundRequest>,
    funds: &HashMap<i64, String>,
    people: &HashMap<i64, String>,
) -> Vec<RequestRow> {
    requests
        .into_iter()
        .map(|r| RequestRow {
            id: r.id,
            fund: funds
                .get(&r.subcategory_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", r.subcategory_id)),
            applicant: people
                .get(&r.user_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", r.user_id)),
            requested: fmt_amount(r.requested_amount),
            approved: r.approved_amount.map_or_else(|| "-".to_string(), fmt_amount),
            status: label(r.status.as_str()),
            status_class: status_class(r.status),
            submitted: fmt_date(r.submitted_at),
            title: r.title,
        })
        .collect()
}

fn people_by_id(users: &[User]) -> HashMap<i64, String> {
    users.iter().map(|u| (u.id, u.full_name.clone())).collect()
}

async fn fund_names(state: &AppState, year_id: Option<i64>) -> Result<HashMap<i64, String>, AppError> {
    match year_id {
        Some(id) => Ok(subcategory_names(&load_fund_tree(state, id).await?)),
        None => Ok(HashMap::new()),
    }
}

struct AnnouncementRow {
    title: String,
    content: String,
    kind: String,
    published: String,
    expires: String,
    status: String,
    attachment_url: String,
}

async fn announcement_rows(state: &AppState, all: bool) -> Result<Vec<AnnouncementRow>, AppError> {
    let announcements = if all {
        state.announcements.list_all().await?
    } else {
        state.announcements.list_visible(Utc::now()).await?
    };
    Ok(announcements
        .into_iter()
        .map(|a| AnnouncementRow {
            kind: label(a.kind.as_str()),
            published: fmt_date(a.published_at),
            expires: fmt_date(a.expires_at),
            status: label(a.status.as_str()),
            title: a.title,
            content: a.content,
            attachment_url: a.attachment_url.unwrap_or_default(),
        })
        .collect())
}

struct FundRow {
    category: String,
    name: String,
    condition: String,
    allocated: String,
    used: String,
    remaining: String,
    grants: String,
    levels: String,
    status: String,
}

fn fund_rows(tree: &[FundCategoryView]) -> Vec<FundRow> {
    tree.iter()
        .flat_map(|cat| {
            cat.subcategories.iter().map(move |sub| FundRow {
                category: cat.name.clone(),
                name: sub.name.clone(),
                condition: sub.fund_condition.clone().unwrap_or_default(),
                allocated: fmt_limit(sub.allocated),
                used: fmt_amount(sub.used_amount),
                remaining: fmt_limit(sub.remaining_amount),
                grants: match sub.max_grants {
                    Some(max) => format!("{} / {}", sub.used_grants, max),
                    None => sub.used_grants.to_string(),
                },
                levels: sub
                    .levels
                    .iter()
                    .map(|l| {
                        let name = l.level.as_deref().unwrap_or("any");
                        let ceiling = fmt_amount(l.max_amount_per_grant);
                        match l.max_grants {
                            Some(max) => format!(
                                "{}: up to {} ({} / {} grants)",
                                name, ceiling, l.used_grants, max
                            ),
                            None => format!("{}: up to {}", name, ceiling),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                status: label(sub.status.as_str()),
            })
        })
        .collect()
}

struct SummaryCards {
    total_requests: usize,
    requested_total: String,
    approved_total: String,
    pending_review: usize,
}

impl SummaryCards {
    fn from_dto(dto: &crate::dto::RequestSummaryDto) -> Self {
        Self {
            total_requests: dto.total_requests,
            requested_total: fmt_amount(dto.requested_total),
            approved_total: fmt_amount(dto.approved_total),
            pending_review: dto.pending_review,
        }
    }
}

// =============================================================================
// Login
// =============================================================================

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    next: String,
    error: String,
    email: String,
}

/// Login form. Already logged-in users go to their dashboard.
pub async fn login_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<LoginPageQuery>,
) -> PageResult {
    if let Some(user) = session_user(&state, &cookies).await? {
        let target = safe_next(query.next.as_deref()).unwrap_or(user.role.dashboard_path());
        return Ok(Redirect::to(target).into_response());
    }

    render(LoginTemplate {
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
        error: query
            .error
            .map(|_| "Invalid email or password.".to_string())
            .unwrap_or_default(),
        email: String::new(),
    })
}

/// Form login: sets the session cookie and redirects to `next` or the
/// role's dashboard.
pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> PageResult {
    let next = safe_next(form.next.as_deref()).map(str::to_string);

    let user = match authenticate(&state, &form.email, &form.password).await {
        Ok(user) => user,
        Err(AppError::Unauthorized) => {
            let page = LoginTemplate {
                next: next.unwrap_or_default(),
                error: "Invalid email or password.".to_string(),
                email: form.email,
            };
            return Ok((StatusCode::UNAUTHORIZED, Html(page.render()?)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&state, &cookies, &user).await?;
    let target = next.unwrap_or_else(|| user.role.dashboard_path().to_string());
    Ok(Redirect::to(&target).into_response())
}

pub async fn logout_page(State(state): State<AppState>, cookies: Cookies) -> PageResult {
    end_session(&state, &cookies).await?;
    Ok(Redirect::to("/login").into_response())
}

pub async fn index(State(state): State<AppState>, cookies: Cookies) -> PageResult {
    let target = match session_user(&state, &cookies).await? {
        Some(user) => user.role.dashboard_path(),
        None => "/login",
    };
    Ok(Redirect::to(target).into_response())
}

// =============================================================================
// Member dashboards
// =============================================================================

#[derive(Template)]
#[template(path = "dashboard_member.html")]
struct MemberDashboardTemplate {
    user_name: String,
    role: &'static str,
    year: String,
    cards: SummaryCards,
    publication_count: usize,
    requests: Vec<RequestRow>,
    funds: Vec<FundRow>,
    announcements: Vec<AnnouncementRow>,
    chart_json: String,
}

#[derive(Template)]
#[template(path = "dashboard_dept_head.html")]
struct DeptHeadDashboardTemplate {
    user_name: String,
    role: &'static str,
    year: String,
    cards: SummaryCards,
    department_cards: SummaryCards,
    publication_count: usize,
    requests: Vec<RequestRow>,
    queue: Vec<RequestRow>,
    funds: Vec<FundRow>,
    announcements: Vec<AnnouncementRow>,
    chart_json: String,
}

#[derive(Serialize)]
struct MemberCharts<'a> {
    requests: &'a crate::dto::ChartSeries,
    department: Option<&'a crate::dto::ChartSeries>,
}

fn year_label(data: &MemberDashboardResponse) -> String {
    data.year
        .as_ref()
        .map_or_else(|| "No current budget year".to_string(), |y| y.year.to_string())
}

/// Role dashboard. Administrators are sent to `/admin`.
pub async fn dashboard(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    if user.role.can_access_admin() {
        return Ok(Redirect::to("/admin").into_response());
    }

    let data = member_dashboard(&state, &user).await?;
    let year_id = data.year.as_ref().map(|y| y.id);
    let full_tree = match year_id {
        Some(id) => load_fund_tree(&state, id).await?,
        None => Vec::new(),
    };
    let funds_by_id = subcategory_names(&full_tree);
    let tree = filter_for_role(full_tree, user.role);

    let own = state
        .requests
        .list(&RequestFilter {
            year_id,
            ..RequestFilter::for_user(user.id)
        })
        .await?;
    let me = HashMap::from([(user.id, user.full_name.clone())]);
    let requests = request_rows(own, &funds_by_id, &me);
    let announcements = announcement_rows(&state, false).await?;

    let chart_json = script_json(&MemberCharts {
        requests: &data.requests.status_chart,
        department: data.department.as_ref().map(|d| &d.status_chart),
    })?;

    if user.role.is_dept_head() {
        let colleagues = match user.department_id {
            Some(id) => state.users.list_by_department(id).await?,
            None => Vec::new(),
        };
        let queue = request_rows(
            review_queue(&state, &user).await?,
            &funds_by_id,
            &people_by_id(&colleagues),
        );
        let department_cards = data
            .department
            .as_ref()
            .map(SummaryCards::from_dto)
            .unwrap_or(SummaryCards {
                total_requests: 0,
                requested_total: fmt_amount(0),
                approved_total: fmt_amount(0),
                pending_review: 0,
            });

        return render(DeptHeadDashboardTemplate {
            year: year_label(&data),
            cards: SummaryCards::from_dto(&data.requests),
            department_cards,
            publication_count: data.publication_count,
            user_name: user.full_name,
            role: role_label(user.role),
            requests,
            queue,
            funds: fund_rows(&tree),
            announcements,
            chart_json,
        });
    }

    render(MemberDashboardTemplate {
        year: year_label(&data),
        cards: SummaryCards::from_dto(&data.requests),
        publication_count: data.publication_count,
        user_name: user.full_name,
        role: role_label(user.role),
        requests,
        funds: fund_rows(&tree),
        announcements,
        chart_json,
    })
}

// =============================================================================
// Admin dashboards
// =============================================================================

struct UsageRow {
    category: String,
    subcategory: String,
    allocated: String,
    used: String,
    remaining: String,
    grants: i64,
}

struct CountRow {
    name: String,
    count: i64,
}

/// Shared by the admin and superadmin dashboards.
struct AdminOverview {
    year: String,
    cards: SummaryCards,
    usage: Vec<UsageRow>,
    users_by_role: Vec<CountRow>,
    publications_total: i64,
    publication_authors: i64,
    last_import: String,
    queue: Vec<RequestRow>,
    chart_json: String,
}

#[derive(Serialize)]
struct AdminCharts<'a> {
    status: &'a crate::dto::ChartSeries,
    approved_by_category: &'a crate::dto::ChartSeries,
    usage: crate::dto::ChartSeries,
}

async fn admin_overview(state: &AppState, admin: &User) -> Result<AdminOverview, PageError> {
    let data: AdminDashboardResponse = admin_dashboard_data(state, None).await?;
    let year_id = data.year.as_ref().map(|y| y.id);

    let users = state.users.list().await?;
    let queue = request_rows(
        review_queue(state, admin).await?,
        &fund_names(state, year_id).await?,
        &people_by_id(&users),
    );

    let usage_chart = crate::dto::ChartSeries {
        labels: data.fund_usage.iter().map(|u| u.subcategory.clone()).collect(),
        values: data.fund_usage.iter().map(|u| u.used_amount).collect(),
    };
    let chart_json = script_json(&AdminCharts {
        status: &data.requests.status_chart,
        approved_by_category: &data.requests.approved_chart,
        usage: usage_chart,
    })?;

    Ok(AdminOverview {
        year: data
            .year
            .as_ref()
            .map_or_else(|| "All years".to_string(), |y| y.year.to_string()),
        cards: SummaryCards::from_dto(&data.requests),
        usage: data
            .fund_usage
            .into_iter()
            .map(|u| UsageRow {
                allocated: fmt_limit(u.allocated),
                used: fmt_amount(u.used_amount),
                remaining: fmt_limit(u.remaining_amount),
                grants: u.used_grants,
                category: u.category,
                subcategory: u.subcategory,
            })
            .collect(),
        users_by_role: data
            .users_by_role
            .into_iter()
            .map(|c| CountRow {
                name: label(&c.name),
                count: c.count,
            })
            .collect(),
        publications_total: data.publications.total,
        publication_authors: data.publications.users_with_publications,
        last_import: fmt_date(data.publications.last_import),
        queue,
        chart_json,
    })
}

#[derive(Template)]
#[template(path = "dashboard_admin.html")]
struct AdminDashboardTemplate {
    user_name: String,
    role: &'static str,
    overview: AdminOverview,
}

struct UserRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    department: String,
    active: bool,
    author_ids: String,
}

#[derive(Template)]
#[template(path = "dashboard_superadmin.html")]
struct SuperAdminDashboardTemplate {
    user_name: String,
    role: &'static str,
    overview: AdminOverview,
    users: Vec<UserRow>,
}

async fn user_rows(state: &AppState) -> Result<Vec<UserRow>, AppError> {
    let departments: HashMap<i64, String> = state
        .users
        .list_departments()
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();

    Ok(state
        .users
        .list()
        .await?
        .into_iter()
        .map(|u| {
            let author_ids = [
                (PublicationSource::Scopus, u.author_id_for(PublicationSource::Scopus)),
                (PublicationSource::Scholar, u.author_id_for(PublicationSource::Scholar)),
            ]
            .iter()
            .filter_map(|(source, id)| id.map(|id| format!("{}: {}", source.as_str(), id)))
            .collect::<Vec<_>>()
            .join(", ");
            UserRow {
                id: u.id,
                department: u
                    .department_id
                    .and_then(|id| departments.get(&id).cloned())
                    .unwrap_or_default(),
                role: role_label(u.role).to_string(),
                active: u.active,
                author_ids,
                name: u.full_name,
                email: u.email,
            }
        })
        .collect())
}

/// Administration dashboard; superadmins also get the account list.
pub async fn admin_home(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    let overview = admin_overview(&state, &user).await?;

    if user.role.can_manage_users() {
        return render(SuperAdminDashboardTemplate {
            users: user_rows(&state).await?,
            user_name: user.full_name,
            role: role_label(user.role),
            overview,
        });
    }

    render(AdminDashboardTemplate {
        user_name: user.full_name,
        role: role_label(user.role),
        overview,
    })
}

// =============================================================================
// Admin pages
// =============================================================================

struct YearRow {
    id: i64,
    year: i32,
    budget: String,
    is_current: bool,
    status: String,
    updated: String,
}

#[derive(Template)]
#[template(path = "admin/years.html")]
struct YearsTemplate {
    user_name: String,
    role: &'static str,
    years: Vec<YearRow>,
}

pub async fn admin_years(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    let years = state
        .years
        .list()
        .await?
        .into_iter()
        .map(|y| YearRow {
            id: y.id,
            year: y.year,
            budget: fmt_amount(y.budget),
            is_current: y.is_current,
            status: label(y.status.as_str()),
            updated: fmt_date(Some(y.updated_at)),
        })
        .collect();

    render(YearsTemplate {
        user_name: user.full_name,
        role: role_label(user.role),
        years,
    })
}

struct YearOption {
    id: i64,
    year: i32,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin/funds.html")]
struct FundsTemplate {
    user_name: String,
    role: &'static str,
    year: String,
    years: Vec<YearOption>,
    funds: Vec<FundRow>,
}

pub async fn admin_funds(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<YearIdQuery>,
) -> PageResult {
    let year = resolve_year(&state, query.year_id).await?;
    let tree = load_fund_tree(&state, year.id).await?;
    let years = state
        .years
        .list()
        .await?
        .into_iter()
        .map(|y| YearOption {
            selected: y.id == year.id,
            id: y.id,
            year: y.year,
        })
        .collect();

    render(FundsTemplate {
        user_name: user.full_name,
        role: role_label(user.role),
        year: year.year.to_string(),
        years,
        funds: fund_rows(&tree),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminRequestsQuery {
    pub year_id: Option<i64>,
    pub status: Option<String>,
}

struct StatusOption {
    value: &'static str,
    label: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin/requests.html")]
struct RequestsTemplate {
    user_name: String,
    role: &'static str,
    year: String,
    statuses: Vec<StatusOption>,
    requests: Vec<RequestRow>,
}

pub async fn admin_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AdminRequestsQuery>,
) -> PageResult {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<RequestStatus>)
        .transpose()?;
    let year = resolve_year(&state, query.year_id).await?;

    let filter = RequestFilter {
        year_id: Some(year.id),
        status,
        ..Default::default()
    };
    let users = state.users.list().await?;
    let requests = request_rows(
        state.requests.list(&filter).await?,
        &fund_names(&state, Some(year.id)).await?,
        &people_by_id(&users),
    );

    let statuses = RequestStatus::ALL
        .iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            label: label(s.as_str()),
            selected: Some(*s) == status,
        })
        .collect();

    render(RequestsTemplate {
        user_name: user.full_name,
        role: role_label(user.role),
        year: year.year.to_string(),
        statuses,
        requests,
    })
}

#[derive(Template)]
#[template(path = "admin/announcements.html")]
struct AnnouncementsTemplate {
    user_name: String,
    role: &'static str,
    announcements: Vec<AnnouncementRow>,
}

pub async fn admin_announcements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> PageResult {
    render(AnnouncementsTemplate {
        announcements: announcement_rows(&state, true).await?,
        user_name: user.full_name,
        role: role_label(user.role),
    })
}

struct ImportRunRow {
    user: String,
    source: String,
    finished: String,
    created: i32,
    updated: i32,
    unchanged: i32,
    failed: i32,
    error: String,
}

#[derive(Template)]
#[template(path = "admin/imports.html")]
struct ImportsTemplate {
    user_name: String,
    role: &'static str,
    scopus_configured: bool,
    scholar_configured: bool,
    publications_total: i64,
    sources: Vec<CountRow>,
    runs: Vec<ImportRunRow>,
}

pub async fn admin_imports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> PageResult {
    let stats = state.publications.get_stats().await?;
    let people = people_by_id(&state.users.list().await?);
    let runs = state
        .publications
        .recent_runs(None, 50)
        .await?
        .into_iter()
        .map(|r| ImportRunRow {
            user: people
                .get(&r.user_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", r.user_id)),
            source: label(r.source.as_str()),
            finished: r.finished_at.format("%Y-%m-%d %H:%M").to_string(),
            created: r.created,
            updated: r.updated,
            unchanged: r.unchanged,
            failed: r.failed,
            error: r.error.unwrap_or_default(),
        })
        .collect();

    render(ImportsTemplate {
        user_name: user.full_name,
        role: role_label(user.role),
        scopus_configured: state.fetchers.is_configured(PublicationSource::Scopus),
        scholar_configured: state.fetchers.is_configured(PublicationSource::Scholar),
        publications_total: stats.total,
        sources: stats
            .by_source
            .into_iter()
            .map(|(name, count)| CountRow {
                name: label(&name),
                count,
            })
            .collect(),
        runs,
    })
}

#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate {
    user_name: String,
    role: &'static str,
    users: Vec<UserRow>,
}

/// Account list; superadmins only.
pub async fn admin_users(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    if !user.role.can_manage_users() {
        return Ok(error_page(
            StatusCode::FORBIDDEN,
            "Account management is reserved for superadmins.",
        ));
    }

    render(UsersTemplate {
        users: user_rows(&state).await?,
        user_name: user.full_name,
        role: role_label(user.role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_amount() {
        assert_eq!(fmt_amount(0), "0");
        assert_eq!(fmt_amount(999), "999");
        assert_eq!(fmt_amount(1000), "1,000");
        assert_eq!(fmt_amount(1234567), "1,234,567");
        assert_eq!(fmt_amount(-25000), "-25,000");
    }

    #[test]
    fn test_label() {
        assert_eq!(label("revision_requested"), "Revision requested");
        assert_eq!(label("dept_head"), "Dept head");
        assert_eq!(label(""), "");
    }

    #[test]
    fn test_script_json_escapes_tags() {
        let json = script_json(&vec!["</script><b>"]).unwrap();
        assert!(!json.contains('<'));
        assert!(json.contains("\\u003c/script>"));
    }

    #[test]
    fn test_login_template_escapes_email() {
        let page = LoginTemplate {
            next: "/admin".to_string(),
            error: "Invalid email or password.".to_string(),
            email: "\"><script>".to_string(),
        }
        .render()
        .unwrap();
        assert!(page.contains("name=\"next\" value=\"/admin\""));
        assert!(!page.contains("\"><script>"));
    }
}
