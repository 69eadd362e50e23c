//! Fund endpoints: the aggregated fund tree and category / subcategory /
//! budget line administration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use grantdesk_core::{AppError, BudgetYear, FundCategoryView, build_fund_tree, filter_for_role};

use crate::auth::{AdminUser, CurrentUser};
use crate::dto::{
    BudgetLineBody, BudgetLineResponse, CategoryBody, CategoryResponse, FundTreeResponse,
    SubcategoryBody, SubcategoryResponse, YearIdQuery,
};
use crate::error::ApiError;
use crate::state::AppState;

/// The year `year_id` points to, or the current year.
pub(crate) async fn resolve_year(
    state: &AppState,
    year_id: Option<i64>,
) -> Result<BudgetYear, AppError> {
    match year_id {
        Some(id) => state.years.require(id).await,
        None => state
            .years
            .current()
            .await?
            .ok_or_else(|| AppError::NotFound("current budget year".to_string())),
    }
}

/// Loads and aggregates the funds of one year, usage included.
pub(crate) async fn load_fund_tree(
    state: &AppState,
    year_id: i64,
) -> Result<Vec<FundCategoryView>, AppError> {
    let rows = state.funds.load_tree_rows(year_id).await?;
    let usage = state.funds.usage_by_subcategory(year_id).await?;
    Ok(build_fund_tree(
        rows.categories,
        rows.subcategories,
        &rows.budget_lines,
        &usage,
    ))
}

fn tree_response(year: BudgetYear, tree: Vec<FundCategoryView>) -> FundTreeResponse {
    FundTreeResponse {
        year: year.into(),
        categories: tree.into_iter().map(Into::into).collect(),
    }
}

/// Funds of the current year the caller may apply for.
#[utoipa::path(
    get,
    path = "/api/v1/funds/available",
    responses(
        (status = 200, description = "Funds open to the caller's role", body = FundTreeResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No current budget year"),
    ),
    tag = "funds"
)]
pub async fn available_funds(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FundTreeResponse>, ApiError> {
    let year = resolve_year(&state, None).await?;
    let tree = filter_for_role(load_fund_tree(&state, year.id).await?, user.role);
    Ok(Json(tree_response(year, tree)))
}

/// Full fund tree of a year, inactive entries included.
#[utoipa::path(
    get,
    path = "/api/v1/funds",
    params(YearIdQuery),
    responses(
        (status = 200, description = "Fund tree", body = FundTreeResponse),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Year not found"),
    ),
    tag = "funds"
)]
pub async fn fund_tree(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<YearIdQuery>,
) -> Result<Json<FundTreeResponse>, ApiError> {
    let year = resolve_year(&state, query.year_id).await?;
    let tree = load_fund_tree(&state, year.id).await?;
    Ok(Json(tree_response(year, tree)))
}

// ===== Categories =====

#[utoipa::path(
    post,
    path = "/api/v1/funds/categories",
    request_body = CategoryBody,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Unknown year"),
    ),
    tag = "funds"
)]
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CategoryBody>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.funds.create_category(&body.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/funds/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryBody,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "funds"
)]
pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<CategoryBody>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.funds.update_category(id, &body.into_new()?).await?;
    Ok(Json(category.into()))
}

/// Delete a category and its subcategories. Refused while requests exist.
#[utoipa::path(
    delete,
    path = "/api/v1/funds/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 409, description = "Category has requests"),
    ),
    tag = "funds"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.funds.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Subcategories =====

#[utoipa::path(
    post,
    path = "/api/v1/funds/subcategories",
    request_body = SubcategoryBody,
    responses(
        (status = 201, description = "Subcategory created", body = SubcategoryResponse),
        (status = 400, description = "Invalid subcategory"),
    ),
    tag = "funds"
)]
pub async fn create_subcategory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<SubcategoryBody>,
) -> Result<(StatusCode, Json<SubcategoryResponse>), ApiError> {
    let subcategory = state.funds.create_subcategory(&body.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(subcategory.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/funds/subcategories/{id}",
    params(("id" = i64, Path, description = "Subcategory id")),
    request_body = SubcategoryBody,
    responses(
        (status = 200, description = "Subcategory updated", body = SubcategoryResponse),
        (status = 404, description = "Subcategory not found"),
    ),
    tag = "funds"
)]
pub async fn update_subcategory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<SubcategoryBody>,
) -> Result<Json<SubcategoryResponse>, ApiError> {
    let subcategory = state.funds.update_subcategory(id, &body.into_new()?).await?;
    Ok(Json(subcategory.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/funds/subcategories/{id}",
    params(("id" = i64, Path, description = "Subcategory id")),
    responses(
        (status = 204, description = "Subcategory deleted"),
        (status = 409, description = "Subcategory has requests"),
    ),
    tag = "funds"
)]
pub async fn delete_subcategory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.funds.delete_subcategory(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Budget lines =====

#[utoipa::path(
    post,
    path = "/api/v1/funds/lines",
    request_body = BudgetLineBody,
    responses(
        (status = 201, description = "Budget line created", body = BudgetLineResponse),
        (status = 400, description = "Invalid budget line"),
    ),
    tag = "funds"
)]
pub async fn create_budget_line(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BudgetLineBody>,
) -> Result<(StatusCode, Json<BudgetLineResponse>), ApiError> {
    let line = state.funds.create_budget_line(&body.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/funds/lines/{id}",
    params(("id" = i64, Path, description = "Budget line id")),
    request_body = BudgetLineBody,
    responses(
        (status = 200, description = "Budget line updated", body = BudgetLineResponse),
        (status = 404, description = "Budget line not found"),
    ),
    tag = "funds"
)]
pub async fn update_budget_line(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<BudgetLineBody>,
) -> Result<Json<BudgetLineResponse>, ApiError> {
    let line = state.funds.update_budget_line(id, &body.into_new()?).await?;
    Ok(Json(line.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/funds/lines/{id}",
    params(("id" = i64, Path, description = "Budget line id")),
    responses(
        (status = 204, description = "Budget line deleted"),
        (status = 404, description = "Budget line not found"),
    ),
    tag = "funds"
)]
pub async fn delete_budget_line(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.funds.delete_budget_line(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
