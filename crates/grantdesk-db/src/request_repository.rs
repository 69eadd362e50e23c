//! Fund requests and their reviews.
//!
//! Status changes are compare-and-set on the current status, so two
//! reviewers acting on the same request cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use grantdesk_core::dashboard::DashboardRow;
use grantdesk_core::{
    AppError, FundRequest, FundRequestDraft, NewFundRequest, NewReview, RequestStatus, Review,
    ReviewDecision, ReviewStage,
};

use crate::{conflict_on_reference, inserted_id};

const REQUEST_COLUMNS: &str = "r.id, r.user_id, r.year_id, r.subcategory_id, r.budget_level, r.title, r.details, r.requested_amount, r.approved_amount, r.status, r.submitted_at, r.decided_at, r.created_at, r.updated_at";
const REVIEW_COLUMNS: &str =
    "id, request_id, reviewer_id, stage, decision, comment, approved_amount, created_at";

/// Optional filters for [`RequestRepository::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub user_id: Option<i64>,
    pub department_id: Option<i64>,
    pub year_id: Option<i64>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_year(mut self, year_id: i64) -> Self {
        self.year_id = Some(year_id);
        self
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, MySql>) {
        builder.push(" WHERE 1 = 1");
        if let Some(user_id) = self.user_id {
            builder.push(" AND r.user_id = ").push_bind(user_id);
        }
        if let Some(department_id) = self.department_id {
            builder
                .push(" AND u.department_id = ")
                .push_bind(department_id);
        }
        if let Some(year_id) = self.year_id {
            builder.push(" AND r.year_id = ").push_bind(year_id);
        }
        if let Some(status) = self.status {
            builder.push(" AND r.status = ").push_bind(status.as_str());
        }
    }
}

#[derive(Clone)]
pub struct RequestRepository {
    pool: MySqlPool,
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: i64,
    user_id: i64,
    year_id: i64,
    subcategory_id: i64,
    budget_level: Option<String>,
    title: String,
    details: Option<String>,
    requested_amount: i64,
    approved_amount: Option<i64>,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// An unknown stored status is an error, never a fallback status.
impl TryFrom<RequestRow> for FundRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<RequestStatus>().map_err(|_| {
            AppError::Generic(format!(
                "fund request {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            year_id: row.year_id,
            subcategory_id: row.subcategory_id,
            budget_level: row.budget_level,
            title: row.title,
            details: row.details,
            requested_amount: row.requested_amount,
            approved_amount: row.approved_amount,
            status,
            submitted_at: row.submitted_at,
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    request_id: i64,
    reviewer_id: i64,
    stage: String,
    decision: String,
    comment: Option<String>,
    approved_amount: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            request_id: row.request_id,
            reviewer_id: row.reviewer_id,
            stage: row.stage.parse().unwrap_or(ReviewStage::Admin),
            decision: row.decision.parse().unwrap_or(ReviewDecision::Revise),
            comment: row.comment,
            approved_amount: row.approved_amount,
            created_at: row.created_at,
        }
    }
}

/// Timestamps written alongside a status change.
fn transition_timestamps(
    to: RequestStatus,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match to {
        RequestStatus::Submitted | RequestStatus::DeptApproved => (Some(now), None),
        RequestStatus::Approved | RequestStatus::Rejected => (None, Some(now)),
        _ => (None, None),
    }
}

impl RequestRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Inserts a new request in `draft`.
    pub async fn create(&self, request: &NewFundRequest) -> Result<FundRequest, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO fund_requests
                (user_id, year_id, subcategory_id, budget_level, title, details,
                 requested_amount, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.user_id)
        .bind(request.year_id)
        .bind(request.subcategory_id)
        .bind(&request.budget_level)
        .bind(request.title.trim())
        .bind(&request.details)
        .bind(request.requested_amount)
        .bind(RequestStatus::Draft.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_reference(e, "unknown user, year or subcategory".to_string()))?;

        let id = inserted_id(&result);
        tracing::info!(request_id = id, user_id = request.user_id, "Fund request created");
        self.require(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<FundRequest>, AppError> {
        let query = format!("SELECT {} FROM fund_requests r WHERE r.id = ?", REQUEST_COLUMNS);
        let row: Option<RequestRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(FundRequest::try_from).transpose()
    }

    pub async fn require(&self, id: i64) -> Result<FundRequest, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("fund request {}", id)))
    }

    /// Requests matching `filter`, newest first.
    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<FundRequest>, AppError> {
        let mut builder = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM fund_requests r JOIN users u ON u.id = r.user_id",
            REQUEST_COLUMNS
        ));
        filter.push_where(&mut builder);
        builder.push(" ORDER BY r.created_at DESC, r.id DESC");

        let rows: Vec<RequestRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(FundRequest::try_from).collect()
    }

    /// Replaces the editable fields of a draft or a request sent back for revision.
    pub async fn update_draft(
        &self,
        id: i64,
        draft: &FundRequestDraft,
    ) -> Result<FundRequest, AppError> {
        draft.validate()?;
        let current = self.require(id).await?;
        if !current.status.is_editable() {
            return Err(AppError::Conflict(format!(
                "fund request {} is {} and can no longer be edited",
                id,
                current.status.as_str()
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE fund_requests
            SET subcategory_id = ?, budget_level = ?, title = ?, details = ?, requested_amount = ?
            WHERE id = ? AND status IN ('draft', 'revision_requested')
            "#,
        )
        .bind(draft.subcategory_id)
        .bind(&draft.budget_level)
        .bind(draft.title.trim())
        .bind(&draft.details)
        .bind(draft.requested_amount)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_reference(
                e,
                format!("fund subcategory {} does not exist", draft.subcategory_id),
            )
        })?;

        let updated = self.require(id).await?;
        // Zero rows is fine for an identical edit, not for a concurrent submit.
        if result.rows_affected() == 0 && !updated.status.is_editable() {
            return Err(AppError::Conflict(format!(
                "fund request {} changed status while being edited",
                id
            )));
        }
        Ok(updated)
    }

    /// Moves a request from `from` to `to`. Returns `false` when the request
    /// was no longer in `from`.
    pub async fn transition(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, AppError> {
        let (submitted_at, decided_at) = transition_timestamps(to, Utc::now());
        let result = sqlx::query(
            r#"
            UPDATE fund_requests
            SET status = ?,
                submitted_at = COALESCE(?, submitted_at),
                decided_at = COALESCE(?, decided_at)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(submitted_at)
        .bind(decided_at)
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        let changed = result.rows_affected() > 0;
        if changed {
            tracing::info!(
                request_id = id,
                from = from.as_str(),
                to = to.as_str(),
                "Fund request status changed"
            );
        }
        Ok(changed)
    }

    /// Records a review and applies its status change atomically.
    ///
    /// Fails with `Conflict` when the request left `from` in the meantime.
    pub async fn apply_review(
        &self,
        review: &NewReview,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<FundRequest, AppError> {
        let (_, decided_at) = transition_timestamps(to, Utc::now());
        let approved_amount = (to == RequestStatus::Approved)
            .then_some(review.approved_amount)
            .flatten();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE fund_requests
            SET status = ?,
                approved_amount = COALESCE(?, approved_amount),
                decided_at = COALESCE(?, decided_at)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(approved_amount)
        .bind(decided_at)
        .bind(review.request_id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "fund request {} is no longer {}",
                review.request_id,
                from.as_str()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO request_reviews
                (request_id, reviewer_id, stage, decision, comment, approved_amount)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(review.request_id)
        .bind(review.reviewer_id)
        .bind(review.stage.as_str())
        .bind(review.decision.as_str())
        .bind(&review.comment)
        .bind(review.approved_amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            request_id = review.request_id,
            reviewer_id = review.reviewer_id,
            stage = review.stage.as_str(),
            decision = review.decision.as_str(),
            to = to.as_str(),
            "Review recorded"
        );

        self.require(review.request_id).await
    }

    /// Review history of a request, oldest first.
    pub async fn reviews_for(&self, request_id: i64) -> Result<Vec<Review>, AppError> {
        let query = format!(
            "SELECT {} FROM request_reviews WHERE request_id = ? ORDER BY created_at, id",
            REVIEW_COLUMNS
        );
        let rows: Vec<ReviewRow> = sqlx::query_as(&query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Rows for [`grantdesk_core::summarize_requests`].
    pub async fn dashboard_rows(&self, filter: &RequestFilter) -> Result<Vec<DashboardRow>, AppError> {
        let mut builder = QueryBuilder::<MySql>::new(
            r#"
            SELECT c.id AS category_id, c.name AS category_name, r.status,
                   r.requested_amount, r.approved_amount
            FROM fund_requests r
            JOIN users u ON u.id = r.user_id
            JOIN fund_subcategories s ON s.id = r.subcategory_id
            JOIN fund_categories c ON c.id = s.category_id
            "#,
        );
        filter.push_where(&mut builder);

        let rows = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
