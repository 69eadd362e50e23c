//! Request DTOs for API endpoints.
//!
//! Enum-valued fields arrive as their stored string form and are parsed
//! into domain types by the `into_*` conversions, so a bad value becomes a
//! 400 with the offending text.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use grantdesk_core::{
    AppError, BudgetScope, FundRequestDraft, NewAnnouncement, NewBudgetLine, NewBudgetYear,
    NewFundCategory, NewFundSubcategory, PublicationSource, RecordStatus, ReviewDecision, Role,
    UserUpdate,
};

/// Maximum number of import runs returned at once.
pub const MAX_IMPORT_RUNS_LIMIT: u32 = 200;

fn parse_status(status: Option<&str>) -> Result<RecordStatus, AppError> {
    status.map_or(Ok(RecordStatus::Active), str::parse)
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "m.rossi@university.edu")]
    pub email: String,
    pub password: String,
}

/// Body of the HTML login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// `?next=` on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub next: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Years and funds
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct YearBody {
    #[schema(example = 2026)]
    pub year: i32,
    /// Total budget in whole currency units
    #[schema(example = 500000)]
    pub budget: i64,
    /// "active" (default) or "inactive"
    pub status: Option<String>,
}

impl YearBody {
    pub fn into_new(self) -> Result<NewBudgetYear, AppError> {
        Ok(NewBudgetYear {
            year: self.year,
            budget: self.budget,
            status: parse_status(self.status.as_deref())?,
        })
    }
}

/// Query parameters selecting a budget year. Defaults to the current year.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct YearIdQuery {
    pub year_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryBody {
    pub year_id: i64,
    #[schema(example = "Research support")]
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryBody {
    pub fn into_new(self) -> Result<NewFundCategory, AppError> {
        Ok(NewFundCategory {
            status: parse_status(self.status.as_deref())?,
            year_id: self.year_id,
            name: self.name,
            description: self.description,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubcategoryBody {
    pub category_id: i64,
    #[schema(example = "Conference travel")]
    pub name: String,
    /// Free-text eligibility conditions shown to applicants
    pub fund_condition: Option<String>,
    /// Roles that may apply, e.g. ["teacher", "dept_head"]
    #[serde(default)]
    pub target_roles: Vec<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl SubcategoryBody {
    pub fn into_new(self) -> Result<NewFundSubcategory, AppError> {
        let target_roles = self
            .target_roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewFundSubcategory {
            status: parse_status(self.status.as_deref())?,
            category_id: self.category_id,
            name: self.name,
            fund_condition: self.fund_condition,
            target_roles,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BudgetLineBody {
    pub subcategory_id: i64,
    /// Level name for per-grant lines, e.g. "international"
    pub level: Option<String>,
    /// "overall" or "per_grant"
    #[schema(example = "per_grant")]
    pub scope: String,
    pub amount: i64,
    pub max_grants: Option<i32>,
    pub description: Option<String>,
}

impl BudgetLineBody {
    pub fn into_new(self) -> Result<NewBudgetLine, AppError> {
        Ok(NewBudgetLine {
            scope: self.scope.parse::<BudgetScope>()?,
            subcategory_id: self.subcategory_id,
            level: self.level,
            amount: self.amount,
            max_grants: self.max_grants,
            description: self.description,
        })
    }
}

// =============================================================================
// Fund requests
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct FundRequestBody {
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    #[schema(example = "ICML 2026 registration and travel")]
    pub title: String,
    pub details: Option<String>,
    #[schema(example = 1800)]
    pub requested_amount: i64,
}

impl From<FundRequestBody> for FundRequestDraft {
    fn from(body: FundRequestBody) -> Self {
        Self {
            subcategory_id: body.subcategory_id,
            budget_level: body.budget_level.filter(|l| !l.trim().is_empty()),
            title: body.title,
            details: body.details,
            requested_amount: body.requested_amount,
        }
    }
}

/// Filters for listing one's own requests.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RequestListQuery {
    pub year_id: Option<i64>,
    /// Request status, e.g. "submitted"
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewBody {
    /// "approve", "reject" or "revise"
    #[schema(example = "approve")]
    pub decision: String,
    pub comment: Option<String>,
    /// Final approval only. Defaults to the requested amount.
    pub approved_amount: Option<i64>,
}

impl ReviewBody {
    pub fn decision(&self) -> Result<ReviewDecision, AppError> {
        self.decision.parse()
    }
}

// =============================================================================
// Announcements
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnouncementBody {
    pub title: String,
    pub content: String,
    /// "general", "fund" or "result"
    #[schema(example = "fund")]
    pub kind: String,
    /// "draft" or "published"
    #[schema(example = "published")]
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
}

impl AnnouncementBody {
    pub fn into_new(self) -> Result<NewAnnouncement, AppError> {
        let announcement = NewAnnouncement {
            kind: self.kind.parse()?,
            status: self.status.parse()?,
            title: self.title,
            content: self.content,
            published_at: self.published_at,
            expires_at: self.expires_at,
            attachment_url: self.attachment_url.filter(|u| !u.trim().is_empty()),
        };
        announcement.validate()?;
        Ok(announcement)
    }
}

// =============================================================================
// Publications
// =============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PublicationQuery {
    /// Publication year
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Publication year covered by the summary
    #[param(example = 2025)]
    pub year: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportRequest {
    /// "scopus" or "scholar"
    #[schema(example = "scopus")]
    pub source: String,
    /// Import one user. When absent, every active user with an author id
    /// for the source is imported.
    pub user_id: Option<i64>,
}

impl ImportRequest {
    pub fn source(&self) -> Result<PublicationSource, AppError> {
        self.source.parse()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ImportRunsQuery {
    pub user_id: Option<i64>,
    /// Maximum number of runs (default: 50, max: 200)
    pub limit: Option<u32>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserBody {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[schema(example = "teacher")]
    pub role: String,
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserBody {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub department_id: Option<i64>,
    pub scopus_author_id: Option<String>,
    pub scholar_author_id: Option<String>,
    /// Replaces the password when present
    pub password: Option<String>,
}

impl UpdateUserBody {
    pub fn to_update(&self) -> Result<UserUpdate, AppError> {
        Ok(UserUpdate {
            full_name: self.full_name.clone(),
            role: self.role.as_deref().map(str::parse).transpose()?,
            department_id: self.department_id,
            scopus_author_id: self.scopus_author_id.clone(),
            scholar_author_id: self.scholar_author_id.clone(),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveBody {
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentBody {
    #[schema(example = "Computer Science")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcategory_body_parses_roles() {
        let body: SubcategoryBody = serde_json::from_str(
            r#"{"category_id": 1, "name": "Travel", "target_roles": ["teacher", "dept_head"]}"#,
        )
        .unwrap();
        let new = body.into_new().unwrap();
        assert_eq!(new.target_roles, vec![Role::Teacher, Role::DeptHead]);
        assert_eq!(new.status, RecordStatus::Active);
    }

    #[test]
    fn test_unknown_enum_values_are_validation_errors() {
        let body: BudgetLineBody = serde_json::from_str(
            r#"{"subcategory_id": 1, "scope": "yearly", "amount": 10}"#,
        )
        .unwrap();
        assert!(matches!(body.into_new(), Err(AppError::Validation(_))));

        let review = ReviewBody {
            decision: "maybe".to_string(),
            comment: None,
            approved_amount: None,
        };
        assert!(matches!(review.decision(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_budget_level_becomes_none() {
        let body = FundRequestBody {
            subcategory_id: 3,
            budget_level: Some("  ".to_string()),
            title: "Travel".to_string(),
            details: None,
            requested_amount: 100,
        };
        let draft: FundRequestDraft = body.into();
        assert_eq!(draft.budget_level, None);
    }
}
