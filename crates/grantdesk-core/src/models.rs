//! Domain models shared by the repositories, services and API layer.
//!
//! Status-like columns are stored as short lowercase strings in MySQL; each
//! of them is modelled here as an enum with `as_str()` / `FromStr` so the
//! database layer can round-trip them without an ORM.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Declares a fieldless enum persisted as a fixed string.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the string representation for database storage.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!(
                        "invalid {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

// =============================================================================
// Enums
// =============================================================================

string_enum! {
    /// Portal role of a user account.
    pub enum Role {
        /// Academic staff member; submits fund requests.
        Teacher => "teacher",
        /// Support staff; submits fund requests for staff-targeted funds.
        Staff => "staff",
        /// Department head ("project responsible"); first-stage reviewer.
        DeptHead => "dept_head",
        /// Research office administrator.
        Admin => "admin",
        /// Administrator who also manages user accounts.
        SuperAdmin => "superadmin",
    }
}

string_enum! {
    /// Active flag used by years, categories and subcategories.
    pub enum RecordStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}

string_enum! {
    /// How a budget line applies to its subcategory.
    pub enum BudgetScope {
        /// Allocation for the subcategory as a whole.
        Overall => "overall",
        /// Ceiling for a single grant at the line's level.
        PerGrant => "per_grant",
    }
}

string_enum! {
    /// Lifecycle status of a fund request. See [`crate::workflow`].
    pub enum RequestStatus {
        Draft => "draft",
        Submitted => "submitted",
        DeptApproved => "dept_approved",
        Approved => "approved",
        Rejected => "rejected",
        RevisionRequested => "revision_requested",
        Withdrawn => "withdrawn",
    }
}

string_enum! {
    /// Which reviewer produced a review.
    pub enum ReviewStage {
        DeptHead => "dept_head",
        Admin => "admin",
    }
}

string_enum! {
    /// Outcome chosen by a reviewer.
    pub enum ReviewDecision {
        Approve => "approve",
        Reject => "reject",
        Revise => "revise",
    }
}

string_enum! {
    pub enum AnnouncementKind {
        General => "general",
        Fund => "fund",
        Result => "result",
    }
}

string_enum! {
    pub enum AnnouncementStatus {
        Draft => "draft",
        Published => "published",
    }
}

string_enum! {
    /// Origin of a publication record.
    pub enum PublicationSource {
        Scopus => "scopus",
        Scholar => "scholar",
        Manual => "manual",
    }
}

// =============================================================================
// Users
// =============================================================================

/// A portal account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub scopus_author_id: Option<String>,
    pub scholar_author_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the configured author identifier for a publication source.
    pub fn author_id_for(&self, source: PublicationSource) -> Option<&str> {
        match source {
            PublicationSource::Scopus => self.scopus_author_id.as_deref(),
            PublicationSource::Scholar => self.scholar_author_id.as_deref(),
            PublicationSource::Manual => None,
        }
    }
}

/// Data needed to insert a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub department_id: Option<i64>,
}

/// Partial update of a user profile; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<i64>,
    pub scopus_author_id: Option<String>,
    pub scholar_author_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Budget years and funds
// =============================================================================

/// A fiscal/academic budget year.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetYear {
    pub id: i64,
    pub year: i32,
    pub budget: i64,
    pub is_current: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudgetYear {
    pub year: i32,
    pub budget: i64,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundCategory {
    pub id: i64,
    pub year_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFundCategory {
    pub year_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundSubcategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub fund_condition: Option<String>,
    pub target_roles: Vec<Role>,
    pub status: RecordStatus,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFundSubcategory {
    pub category_id: i64,
    pub name: String,
    pub fund_condition: Option<String>,
    pub target_roles: Vec<Role>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub sort_order: i32,
}

/// One budget row attached to a subcategory.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetLine {
    pub id: i64,
    pub subcategory_id: i64,
    pub level: Option<String>,
    pub scope: BudgetScope,
    pub amount: i64,
    pub max_grants: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudgetLine {
    pub subcategory_id: i64,
    pub level: Option<String>,
    pub scope: BudgetScope,
    pub amount: i64,
    pub max_grants: Option<i32>,
    pub description: Option<String>,
}

/// Approved usage of one budget level of a subcategory within a year.
///
/// A subcategory's totals are the sum of its rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubcategoryUsage {
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    pub approved_count: i64,
    pub approved_amount: i64,
}

// =============================================================================
// Fund requests and reviews
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FundRequest {
    pub id: i64,
    pub user_id: i64,
    pub year_id: i64,
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub requested_amount: i64,
    pub approved_amount: Option<i64>,
    pub status: RequestStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFundRequest {
    pub user_id: i64,
    pub year_id: i64,
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub requested_amount: i64,
}

/// Editable fields of a request while it is a draft or sent back for revision.
#[derive(Debug, Clone, Deserialize)]
pub struct FundRequestDraft {
    pub subcategory_id: i64,
    pub budget_level: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub requested_amount: i64,
}

impl FundRequestDraft {
    /// Checks the fields a user can get wrong before touching the database.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if self.requested_amount <= 0 {
            return Err(AppError::Validation(
                "requested_amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub request_id: i64,
    pub reviewer_id: i64,
    pub stage: ReviewStage,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
    pub approved_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub request_id: i64,
    pub reviewer_id: i64,
    pub stage: ReviewStage,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
    pub approved_amount: Option<i64>,
}

// =============================================================================
// Announcements
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub status: AnnouncementStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Published, already started and not yet expired.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AnnouncementStatus::Published
            && self.published_at.is_none_or(|p| p <= now)
            && self.expires_at.is_none_or(|e| e > now)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub status: AnnouncementStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
}

impl NewAnnouncement {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if let (Some(start), Some(end)) = (self.published_at, self.expires_at) {
            if end <= start {
                return Err(AppError::Validation(
                    "expires_at must be after published_at".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Publications
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub authors: String,
    pub venue: Option<String>,
    pub pub_year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_count: i32,
    pub source: PublicationSource,
    pub external_id: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A publication as returned by a remote bibliographic API, before it is
/// attributed to a portal user.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePublication {
    pub external_id: String,
    pub title: String,
    pub authors: String,
    pub venue: Option<String>,
    pub pub_year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_count: i32,
}

impl RemotePublication {
    /// Attributes the record to `user_id` and computes its content hash.
    pub fn into_new_publication(self, user_id: i64, source: PublicationSource) -> NewPublication {
        let content_hash = NewPublication::compute_content_hash(
            &self.title,
            &self.authors,
            self.venue.as_deref(),
            self.pub_year,
            self.doi.as_deref(),
            self.url.as_deref(),
            self.citation_count,
        );
        NewPublication {
            user_id,
            title: self.title,
            authors: self.authors,
            venue: self.venue,
            pub_year: self.pub_year,
            doi: self.doi,
            url: self.url,
            citation_count: self.citation_count,
            source,
            external_id: self.external_id,
            content_hash,
        }
    }
}

/// Data needed to insert or update a publication.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPublication {
    pub user_id: i64,
    pub title: String,
    pub authors: String,
    pub venue: Option<String>,
    pub pub_year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_count: i32,
    pub source: PublicationSource,
    pub external_id: String,
    pub content_hash: String,
}

impl NewPublication {
    /// SHA-256 hex digest of the fields that matter for change detection.
    ///
    /// Covers every stored field, so a DOI or link added upstream is written.
    /// Whitespace at either end is ignored so cosmetic API differences do not
    /// register as updates.
    pub fn compute_content_hash(
        title: &str,
        authors: &str,
        venue: Option<&str>,
        pub_year: Option<i32>,
        doi: Option<&str>,
        url: Option<&str>,
        citation_count: i32,
    ) -> String {
        let mut hasher = Sha256::new();
        for field in [title, authors, venue.unwrap_or(""), doi.unwrap_or(""), url.unwrap_or("")] {
            hasher.update(field.trim().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(pub_year.map(|y| y.to_string()).unwrap_or_default().as_bytes());
        hasher.update(b"\n");
        hasher.update(citation_count.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Bookkeeping row for one import of one user from one source.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRun {
    pub id: i64,
    pub user_id: i64,
    pub source: PublicationSource,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error: Option<String>,
}

/// Data needed to record a finished import run.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImportRun {
    pub user_id: i64,
    pub source: PublicationSource,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error: Option<String>,
}
