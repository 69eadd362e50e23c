//! Fund request endpoints: drafting, submission and review.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use grantdesk_core::workflow::review_stage_for;
use grantdesk_core::{
    AppError, FundRequest, FundRequestDraft, NewFundRequest, NewReview, RequestAction,
    RequestStatus, User, authorize, check_allocation, filter_for_role, find_subcategory,
    next_status,
};
use grantdesk_db::RequestFilter;

use crate::auth::{CurrentUser, ReviewerUser, actor_of};
use crate::dto::{
    FundRequestBody, FundRequestDetailResponse, FundRequestResponse, RequestListQuery, ReviewBody,
};
use crate::error::ApiError;
use crate::handlers::funds::{load_fund_tree, resolve_year};
use crate::state::AppState;

async fn load_with_owner(state: &AppState, id: i64) -> Result<(FundRequest, User), AppError> {
    let request = state.requests.require(id).await?;
    let owner = state.users.require(request.user_id).await?;
    Ok((request, owner))
}

/// Owner, a department head of the owner's department, or an administrator.
pub(crate) fn can_view(viewer: &User, owner: &User) -> bool {
    viewer.id == owner.id
        || viewer.role.can_access_admin()
        || (viewer.role.is_dept_head()
            && viewer.department_id.is_some()
            && viewer.department_id == owner.department_id)
}

/// Validates a draft against the current year's funds open to `owner`.
/// Returns the budget year of the chosen subcategory.
async fn check_draft(
    state: &AppState,
    owner: &User,
    draft: &FundRequestDraft,
) -> Result<i64, AppError> {
    draft.validate()?;

    let year_id = state
        .funds
        .year_of_subcategory(draft.subcategory_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("fund subcategory {}", draft.subcategory_id)))?;
    let current = resolve_year(state, None).await?;
    if year_id != current.id {
        return Err(AppError::Validation(format!(
            "fund subcategory {} does not belong to the current budget year",
            draft.subcategory_id
        )));
    }

    check_request_fits(
        state,
        owner,
        year_id,
        draft.subcategory_id,
        draft.budget_level.as_deref(),
        draft.requested_amount,
    )
    .await?;
    Ok(year_id)
}

/// Checks `amount` against the subcategory as `owner` sees it.
async fn check_request_fits(
    state: &AppState,
    owner: &User,
    year_id: i64,
    subcategory_id: i64,
    level: Option<&str>,
    amount: i64,
) -> Result<(), AppError> {
    let tree = filter_for_role(load_fund_tree(state, year_id).await?, owner.role);
    let sub = find_subcategory(&tree, subcategory_id).ok_or_else(|| {
        AppError::Forbidden("this fund is not open to your role".to_string())
    })?;
    check_allocation(sub, level, amount)
}

/// Applies a compare-and-set transition, 409 when the request moved on.
async fn transition(
    state: &AppState,
    request: &FundRequest,
    to: RequestStatus,
) -> Result<FundRequest, AppError> {
    if !state.requests.transition(request.id, request.status, to).await? {
        return Err(AppError::Conflict(format!(
            "fund request {} changed status, reload and try again",
            request.id
        )));
    }
    state.requests.require(request.id).await
}

/// List the caller's own requests.
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "Own requests, newest first", body = Vec<FundRequestResponse>),
        (status = 401, description = "Not logged in"),
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Vec<FundRequestResponse>>, ApiError> {
    let mut filter = RequestFilter::for_user(user.id);
    filter.year_id = query.year_id;
    filter.status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()?;

    let requests = state.requests.list(&filter).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Create a draft request.
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = FundRequestBody,
    responses(
        (status = 201, description = "Draft created", body = FundRequestResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Fund not open to the caller's role"),
        (status = 422, description = "Amount exceeds the fund budget"),
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<FundRequestBody>,
) -> Result<(StatusCode, Json<FundRequestResponse>), ApiError> {
    if !user.role.can_submit_requests() {
        return Err(ApiError::Forbidden(
            "your role cannot apply for funds".to_string(),
        ));
    }

    let draft = FundRequestDraft::from(body);
    let year_id = check_draft(&state, &user, &draft).await?;

    let request = state
        .requests
        .create(&NewFundRequest {
            user_id: user.id,
            year_id,
            subcategory_id: draft.subcategory_id,
            budget_level: draft.budget_level,
            title: draft.title,
            details: draft.details,
            requested_amount: draft.requested_amount,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// A request with its review history.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request detail", body = FundRequestDetailResponse),
        (status = 403, description = "Not visible to the caller"),
        (status = 404, description = "Request not found"),
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<FundRequestDetailResponse>, ApiError> {
    let (request, owner) = load_with_owner(&state, id).await?;
    if !can_view(&user, &owner) {
        return Err(ApiError::Forbidden(
            "this request belongs to someone else".to_string(),
        ));
    }

    let reviews = state.requests.reviews_for(id).await?;
    Ok(Json(FundRequestDetailResponse {
        request: request.into(),
        reviews: reviews.into_iter().map(Into::into).collect(),
    }))
}

/// Edit a draft or a request sent back for revision.
#[utoipa::path(
    put,
    path = "/api/v1/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    request_body = FundRequestBody,
    responses(
        (status = 200, description = "Request updated", body = FundRequestResponse),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Request is no longer editable"),
        (status = 422, description = "Amount exceeds the fund budget"),
    ),
    tag = "requests"
)]
pub async fn update_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<FundRequestBody>,
) -> Result<Json<FundRequestResponse>, ApiError> {
    let request = state.requests.require(id).await?;
    if request.user_id != user.id {
        return Err(ApiError::Forbidden(
            "only the owner can edit a request".to_string(),
        ));
    }
    if !request.status.is_editable() {
        return Err(ApiError::Conflict(format!(
            "request is {} and can no longer be edited",
            request.status
        )));
    }

    let draft = FundRequestDraft::from(body);
    check_draft(&state, &user, &draft).await?;
    let updated = state.requests.update_draft(id, &draft).await?;
    Ok(Json(updated.into()))
}

/// Submit a request for review.
///
/// A department head's own request goes straight to the final review.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/submit",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request submitted", body = FundRequestResponse),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Request cannot be submitted in its status"),
        (status = 422, description = "Amount exceeds the fund budget"),
    ),
    tag = "requests"
)]
pub async fn submit_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<FundRequestResponse>, ApiError> {
    let (request, owner) = load_with_owner(&state, id).await?;
    authorize(RequestAction::Submit, &actor_of(&user), &actor_of(&owner))?;
    let next = next_status(request.status, RequestAction::Submit, owner.role)?;

    check_request_fits(
        &state,
        &owner,
        request.year_id,
        request.subcategory_id,
        request.budget_level.as_deref(),
        request.requested_amount,
    )
    .await?;

    let updated = transition(&state, &request, next).await?;
    Ok(Json(updated.into()))
}

/// Withdraw a request that has not been decided yet.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/withdraw",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request withdrawn", body = FundRequestResponse),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Request cannot be withdrawn in its status"),
    ),
    tag = "requests"
)]
pub async fn withdraw_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<FundRequestResponse>, ApiError> {
    let (request, owner) = load_with_owner(&state, id).await?;
    authorize(RequestAction::Withdraw, &actor_of(&user), &actor_of(&owner))?;
    let next = next_status(request.status, RequestAction::Withdraw, owner.role)?;

    let updated = transition(&state, &request, next).await?;
    Ok(Json(updated.into()))
}

/// Record a review decision.
///
/// Department heads review at the department stage, administrators at the
/// final stage. A final approval is checked against the live fund usage.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/review",
    params(("id" = i64, Path, description = "Request id")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Review recorded", body = FundRequestResponse),
        (status = 400, description = "Invalid decision or amount"),
        (status = 403, description = "Caller may not review this request"),
        (status = 409, description = "Request is not awaiting this review"),
        (status = 422, description = "Approval exceeds the fund budget"),
    ),
    tag = "reviews"
)]
pub async fn review_request(
    State(state): State<AppState>,
    ReviewerUser(reviewer): ReviewerUser,
    Path(id): Path<i64>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<FundRequestResponse>, ApiError> {
    let decision = body.decision()?;
    let stage = review_stage_for(reviewer.role)
        .ok_or_else(|| ApiError::Forbidden("reviewer role required".to_string()))?;
    let action = RequestAction::Review { stage, decision };

    let (request, owner) = load_with_owner(&state, id).await?;
    authorize(action, &actor_of(&reviewer), &actor_of(&owner))?;
    let next = next_status(request.status, action, owner.role)?;

    let approved_amount = if next == RequestStatus::Approved {
        let amount = body.approved_amount.unwrap_or(request.requested_amount);
        if amount <= 0 || amount > request.requested_amount {
            return Err(ApiError::BadRequest(format!(
                "approved_amount must be between 1 and the requested {}",
                request.requested_amount
            )));
        }
        let tree = load_fund_tree(&state, request.year_id).await?;
        let sub = find_subcategory(&tree, request.subcategory_id).ok_or_else(|| {
            AppError::NotFound(format!("fund subcategory {}", request.subcategory_id))
        })?;
        check_allocation(sub, request.budget_level.as_deref(), amount)?;
        Some(amount)
    } else {
        None
    };

    let review = NewReview {
        request_id: request.id,
        reviewer_id: reviewer.id,
        stage,
        decision,
        comment: body.comment.filter(|c| !c.trim().is_empty()),
        approved_amount,
    };
    let updated = state
        .requests
        .apply_review(&review, request.status, next)
        .await?;

    Ok(Json(updated.into()))
}

/// Requests waiting for the caller's review.
///
/// Department heads see submitted requests of their department (their own
/// excluded); administrators see requests approved by a department.
#[utoipa::path(
    get,
    path = "/api/v1/reviews/pending",
    responses(
        (status = 200, description = "Review queue, newest first", body = Vec<FundRequestResponse>),
        (status = 403, description = "Reviewer role required"),
    ),
    tag = "reviews"
)]
pub async fn pending_reviews(
    State(state): State<AppState>,
    ReviewerUser(reviewer): ReviewerUser,
) -> Result<Json<Vec<FundRequestResponse>>, ApiError> {
    let requests = review_queue(&state, &reviewer).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// The review queue of `reviewer`, empty for roles that do not review.
pub(crate) async fn review_queue(
    state: &AppState,
    reviewer: &User,
) -> Result<Vec<FundRequest>, AppError> {
    let filter = if reviewer.role.can_access_admin() {
        RequestFilter::default().with_status(RequestStatus::DeptApproved)
    } else if let (true, Some(department_id)) =
        (reviewer.role.is_dept_head(), reviewer.department_id)
    {
        RequestFilter {
            department_id: Some(department_id),
            ..Default::default()
        }
        .with_status(RequestStatus::Submitted)
    } else {
        return Ok(Vec::new());
    };

    let mut requests = state.requests.list(&filter).await?;
    requests.retain(|r| r.user_id != reviewer.id);
    Ok(requests)
}
