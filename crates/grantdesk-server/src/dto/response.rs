//! Response DTOs for API endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use grantdesk_core::dashboard::{CategoryTotal, StatusCount};
use grantdesk_core::{
    Announcement, BatchImportSummary, BudgetLine, BudgetYear, Department, FundCategory,
    FundCategoryView, FundLevelView, FundRequest, FundSubcategory, FundSubcategoryView,
    ImportRun, ImportStats, Publication, RequestSummary, Review, User, UserImportResult,
};
use grantdesk_db::PublicationStats;

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Server version
    pub version: String,
    /// Database connectivity status
    pub database: ServiceStatus,
}

/// Status of an individual service component.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    /// Whether the service is reachable
    pub healthy: bool,
    /// Optional message (e.g., error details)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// A user account. The password hash is never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub department_id: Option<i64>,
    pub scopus_author_id: Option<String>,
    pub scholar_author_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role.as_str().to_string(),
            department_id: u.department_id,
            scopus_author_id: u.scopus_author_id,
            scholar_author_id: u.scholar_author_id,
            active: u.active,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    /// Landing page for the user's role
    #[schema(example = "/dashboard")]
    pub dashboard: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: i64,
    pub name: String,
}

impl From<Department> for DepartmentResponse {
    fn from(d: Department) -> Self {
        Self {
            id: d.id,
            name: d.name,
        }
    }
}

// =============================================================================
// Years and funds
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct YearResponse {
    pub id: i64,
    pub year: i32,
    pub budget: i64,
    pub is_current: bool,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl From<BudgetYear> for YearResponse {
    fn from(y: BudgetYear) -> Self {
        Self {
            id: y.id,
            year: y.year,
            budget: y.budget,
            is_current: y.is_current,
            status: y.status.as_str().to_string(),
            updated_at: y.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub year_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub sort_order: i32,
}

impl From<FundCategory> for CategoryResponse {
    fn from(c: FundCategory) -> Self {
        Self {
            id: c.id,
            year_id: c.year_id,
            name: c.name,
            description: c.description,
            status: c.status.as_str().to_string(),
            sort_order: c.sort_order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubcategoryResponse {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub fund_condition: Option<String>,
    pub target_roles: Vec<String>,
    pub status: String,
    pub sort_order: i32,
}

impl From<FundSubcategory> for SubcategoryResponse {
    fn from(s: FundSubcategory) -> Self {
        Self {
            id: s.id,
            category_id: s.category_id,
            name: s.name,
            fund_condition: s.fund_condition,
            target_roles: s.target_roles.iter().map(|r| r.as_str().to_string()).collect(),
            status: s.status.as_str().to_string(),
            sort_order: s.sort_order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BudgetLineResponse {
    pub id: i64,
    pub subcategory_id: i64,
    pub level: Option<String>,
    pub scope: String,
    pub amount: i64,
    pub max_grants: Option<i32>,
    pub description: Option<String>,
}

impl From<BudgetLine> for BudgetLineResponse {
    fn from(b: BudgetLine) -> Self {
        Self {
            id: b.id,
            subcategory_id: b.subcategory_id,
            level: b.level,
            scope: b.scope.as_str().to_string(),
            amount: b.amount,
            max_grants: b.max_grants,
            description: b.description,
        }
    }
}

/// Funds of one year, grouped by category.
#[derive(Debug, Serialize, ToSchema)]
pub struct FundTreeResponse {
    pub year: YearResponse,
    pub categories: Vec<FundCategoryDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FundCategoryDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub subcategories: Vec<FundSubcategoryDto>,
}

impl From<FundCategoryView> for FundCategoryDto {
    fn from(c: FundCategoryView) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            status: c.status.as_str().to_string(),
            subcategories: c.subcategories.into_iter().map(Into::into).collect(),
        }
    }
}

/// A subcategory with its budget and live usage.
#[derive(Debug, Serialize, ToSchema)]
pub struct FundSubcategoryDto {
    pub id: i64,
    pub name: String,
    pub fund_condition: Option<String>,
    pub target_roles: Vec<String>,
    pub status: String,
    /// Overall allocation; null means unlimited
    pub allocated: Option<i64>,
    /// Maximum number of grants; null means unlimited
    pub max_grants: Option<i64>,
    pub levels: Vec<FundLevelDto>,
    pub used_amount: i64,
    pub used_grants: i64,
    pub remaining_amount: Option<i64>,
    pub remaining_grants: Option<i64>,
}

impl From<FundSubcategoryView> for FundSubcategoryDto {
    fn from(s: FundSubcategoryView) -> Self {
        Self {
            id: s.id,
            name: s.name,
            fund_condition: s.fund_condition,
            target_roles: s.target_roles.iter().map(|r| r.as_str().to_string()).collect(),
            status: s.status.as_str().to_string(),
            allocated: s.allocated,
            max_grants: s.max_grants,
            levels: s.levels.into_iter().map(Into::into).collect(),
            used_amount: s.used_amount,
            used_grants: s.used_grants,
            remaining_amount: s.remaining_amount,
            remaining_grants: s.remaining_grants,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FundLevelDto {
    pub level: Option<String>,
    pub max_amount_per_grant: i64,
    pub max_grants: Option<i64>,
    pub description: Option<String>,
    pub used_grants: i64,
    pub remaining_grants: Option<i64>,
}

impl From<FundLevelView> for FundLevelDto {
    fn from(l: FundLevelView) -> Self {
        Self {
            level: l.level,
            max_amount_per_grant: l.max_amount_per_grant,
            max_grants: l.max_grants,
            description: l.description,
            used_grants: l.used_grants,
            remaining_grants: l.remaining_grants,
        }
    }
}

// =============================================================================
// Fund requests
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct FundRequestResponse {
    pub id: i64,
    pub user_id: i64,
    pub year_id: i64,
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub requested_amount: i64,
    pub approved_amount: Option<i64>,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FundRequest> for FundRequestResponse {
    fn from(r: FundRequest) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            year_id: r.year_id,
            subcategory_id: r.subcategory_id,
            budget_level: r.budget_level,
            title: r.title,
            details: r.details,
            requested_amount: r.requested_amount,
            approved_amount: r.approved_amount,
            status: r.status.as_str().to_string(),
            submitted_at: r.submitted_at,
            decided_at: r.decided_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i64,
    pub reviewer_id: i64,
    pub stage: String,
    pub decision: String,
    pub comment: Option<String>,
    pub approved_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            reviewer_id: r.reviewer_id,
            stage: r.stage.as_str().to_string(),
            decision: r.decision.as_str().to_string(),
            comment: r.comment,
            approved_amount: r.approved_amount,
            created_at: r.created_at,
        }
    }
}

/// A request with its review history.
#[derive(Debug, Serialize, ToSchema)]
pub struct FundRequestDetailResponse {
    pub request: FundRequestResponse,
    pub reviews: Vec<ReviewResponse>,
}

// =============================================================================
// Announcements
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Announcement> for AnnouncementResponse {
    fn from(a: Announcement) -> Self {
        Self {
            id: a.id,
            title: a.title,
            content: a.content,
            kind: a.kind.as_str().to_string(),
            status: a.status.as_str().to_string(),
            published_at: a.published_at,
            expires_at: a.expires_at,
            attachment_url: a.attachment_url,
            updated_at: a.updated_at,
        }
    }
}

// =============================================================================
// Publications and imports
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationResponse {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub venue: Option<String>,
    pub pub_year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_count: i32,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Publication> for PublicationResponse {
    fn from(p: Publication) -> Self {
        Self {
            id: p.id,
            title: p.title,
            authors: p.authors,
            venue: p.venue,
            pub_year: p.pub_year,
            doi: p.doi,
            url: p.url,
            citation_count: p.citation_count,
            source: p.source.as_str().to_string(),
            updated_at: p.updated_at,
        }
    }
}

/// Import statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportStatsDto {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub total: usize,
}

impl From<ImportStats> for ImportStatsDto {
    fn from(s: ImportStats) -> Self {
        Self {
            created: s.created,
            updated: s.updated,
            unchanged: s.unchanged,
            failed: s.failed,
            total: s.total(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserImportDto {
    pub user_id: i64,
    pub label: String,
    pub stats: ImportStatsDto,
    pub error: Option<String>,
}

impl From<UserImportResult> for UserImportDto {
    fn from(r: UserImportResult) -> Self {
        Self {
            user_id: r.user_id,
            label: r.label,
            stats: r.stats.into(),
            error: r.error,
        }
    }
}

/// Outcome of an import request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub source: String,
    pub users: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<UserImportDto>,
}

impl ImportResponse {
    pub fn from_summary(source: &str, summary: BatchImportSummary) -> Self {
        Self {
            source: source.to_string(),
            users: summary.total_users(),
            successful: summary.successful_count(),
            failed: summary.failed_count(),
            results: summary.results.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportRunResponse {
    pub id: i64,
    pub user_id: i64,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error: Option<String>,
}

impl From<ImportRun> for ImportRunResponse {
    fn from(r: ImportRun) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            source: r.source.as_str().to_string(),
            started_at: r.started_at,
            finished_at: r.finished_at,
            created: r.created,
            updated: r.updated,
            unchanged: r.unchanged,
            failed: r.failed,
            error: r.error,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationStatsDto {
    pub total: i64,
    pub users_with_publications: i64,
    pub by_source: Vec<NamedCount>,
    pub last_import: Option<DateTime<Utc>>,
}

impl From<PublicationStats> for PublicationStatsDto {
    fn from(s: PublicationStats) -> Self {
        Self {
            total: s.total,
            users_with_publications: s.users_with_publications,
            by_source: s.by_source.into_iter().map(NamedCount::from).collect(),
            last_import: s.last_import,
        }
    }
}

// =============================================================================
// Dashboards
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

impl From<(String, i64)> for NamedCount {
    fn from((name, count): (String, i64)) -> Self {
        Self { name, count }
    }
}

/// Labels and values ready for a chart.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryTotalDto {
    pub category_id: i64,
    pub name: String,
    pub requests: usize,
    pub requested: i64,
    pub approved: i64,
}

impl From<CategoryTotal> for CategoryTotalDto {
    fn from(c: CategoryTotal) -> Self {
        Self {
            category_id: c.category_id,
            name: c.name,
            requests: c.requests,
            requested: c.requested,
            approved: c.approved,
        }
    }
}

/// Aggregated request numbers with chart series.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestSummaryDto {
    pub total_requests: usize,
    pub requested_total: i64,
    pub approved_total: i64,
    pub pending_review: usize,
    pub by_category: Vec<CategoryTotalDto>,
    /// Request count per status, in lifecycle order
    pub status_chart: ChartSeries,
    /// Approved amount per category
    pub approved_chart: ChartSeries,
}

fn status_chart(by_status: &[StatusCount]) -> ChartSeries {
    ChartSeries {
        labels: by_status.iter().map(|s| s.status.as_str().to_string()).collect(),
        values: by_status
            .iter()
            .map(|s| i64::try_from(s.count).unwrap_or(i64::MAX))
            .collect(),
    }
}

impl From<RequestSummary> for RequestSummaryDto {
    fn from(s: RequestSummary) -> Self {
        let status_chart = status_chart(&s.by_status);
        let approved_chart = ChartSeries {
            labels: s.by_category.iter().map(|c| c.name.clone()).collect(),
            values: s.by_category.iter().map(|c| c.approved).collect(),
        };
        Self {
            total_requests: s.total_requests,
            requested_total: s.requested_total,
            approved_total: s.approved_total,
            pending_review: s.pending_review,
            by_category: s.by_category.into_iter().map(Into::into).collect(),
            status_chart,
            approved_chart,
        }
    }
}

/// Dashboard of a teacher, staff member or department head.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberDashboardResponse {
    pub user: UserResponse,
    pub year: Option<YearResponse>,
    pub requests: RequestSummaryDto,
    /// Department-wide numbers, department heads only
    pub department: Option<RequestSummaryDto>,
    /// Requests waiting for this user's review
    pub pending_reviews: usize,
    pub publication_count: usize,
}

/// Budget use of one subcategory.
#[derive(Debug, Serialize, ToSchema)]
pub struct FundUsageDto {
    pub category: String,
    pub subcategory: String,
    pub allocated: Option<i64>,
    pub used_amount: i64,
    pub remaining_amount: Option<i64>,
    pub used_grants: i64,
}

/// Administration dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboardResponse {
    pub year: Option<YearResponse>,
    pub requests: RequestSummaryDto,
    pub fund_usage: Vec<FundUsageDto>,
    pub users_by_role: Vec<NamedCount>,
    pub publications: PublicationStatsDto,
}

pub fn fund_usage(tree: &[FundCategoryView]) -> Vec<FundUsageDto> {
    tree.iter()
        .flat_map(|cat| {
            cat.subcategories.iter().map(|sub| FundUsageDto {
                category: cat.name.clone(),
                subcategory: sub.name.clone(),
                allocated: sub.allocated,
                used_amount: sub.used_amount,
                remaining_amount: sub.remaining_amount,
                used_grants: sub.used_grants,
            })
        })
        .collect()
}
