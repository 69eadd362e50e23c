//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::dto::{
    AdminDashboardResponse, AnnouncementBody, AnnouncementResponse, BudgetLineBody,
    BudgetLineResponse, CategoryBody, CategoryResponse, CategoryTotalDto, ChartSeries,
    CreateUserBody, DepartmentBody, DepartmentResponse, FundCategoryDto, FundLevelDto,
    FundRequestBody, FundRequestDetailResponse, FundRequestResponse, FundSubcategoryDto,
    FundTreeResponse, FundUsageDto, HealthResponse, ImportRequest, ImportResponse,
    ImportRunResponse, ImportStatsDto, LoginRequest, LoginResponse, MemberDashboardResponse,
    NamedCount, PublicationResponse, PublicationStatsDto, RequestSummaryDto, ReviewBody,
    ReviewResponse, ServiceStatus, SetActiveBody, SubcategoryBody, SubcategoryResponse,
    UpdateUserBody, UserImportDto, UserResponse, YearBody, YearResponse,
};
use crate::error::ErrorResponse;
use crate::handlers::{
    announcements, auth, dashboard, funds, health, publications, requests, users, years,
};

/// OpenAPI documentation for the GrantDesk API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GrantDesk API",
        version = "1.0.0",
        description = "Research fund and grant administration portal.

GrantDesk manages yearly research budgets, the funds they are split into, and
the fund requests of teachers and staff through department-head and
administrator review. It also imports publication lists from Scopus and
Google Scholar and renders yearly publication summaries as PDF.

## Authentication

All endpoints except `/health`, `/auth/login` and `GET /announcements` need the
session cookie set by `POST /api/v1/auth/login` (or the `/login` form).

## Quick Start

1. Log in: `POST /api/v1/auth/login`
2. See what you can apply for: `GET /api/v1/funds/available`
3. Create and submit a request: `POST /api/v1/requests`, then `POST /api/v1/requests/{id}/submit`
",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        health::health_check,
        auth::login,
        auth::logout,
        auth::me,
        years::list_years,
        years::create_year,
        years::update_year,
        years::delete_year,
        years::set_current_year,
        funds::available_funds,
        funds::fund_tree,
        funds::create_category,
        funds::update_category,
        funds::delete_category,
        funds::create_subcategory,
        funds::update_subcategory,
        funds::delete_subcategory,
        funds::create_budget_line,
        funds::update_budget_line,
        funds::delete_budget_line,
        requests::list_requests,
        requests::create_request,
        requests::get_request,
        requests::update_request,
        requests::submit_request,
        requests::withdraw_request,
        requests::review_request,
        requests::pending_reviews,
        announcements::list_visible,
        announcements::list_all,
        announcements::create_announcement,
        announcements::update_announcement,
        announcements::delete_announcement,
        publications::list_publications,
        publications::delete_publication,
        publications::my_summary,
        publications::user_summary,
        publications::trigger_import,
        publications::list_import_runs,
        dashboard::my_dashboard,
        dashboard::admin_dashboard,
        users::list_users,
        users::create_user,
        users::update_user,
        users::set_user_active,
        users::list_departments,
        users::create_department,
    ),
    components(
        schemas(
            // Request types
            LoginRequest,
            YearBody,
            CategoryBody,
            SubcategoryBody,
            BudgetLineBody,
            FundRequestBody,
            ReviewBody,
            AnnouncementBody,
            ImportRequest,
            CreateUserBody,
            UpdateUserBody,
            SetActiveBody,
            DepartmentBody,
            // Response types
            ErrorResponse,
            HealthResponse,
            ServiceStatus,
            UserResponse,
            LoginResponse,
            DepartmentResponse,
            YearResponse,
            CategoryResponse,
            SubcategoryResponse,
            BudgetLineResponse,
            FundTreeResponse,
            FundCategoryDto,
            FundSubcategoryDto,
            FundLevelDto,
            FundRequestResponse,
            ReviewResponse,
            FundRequestDetailResponse,
            AnnouncementResponse,
            PublicationResponse,
            ImportStatsDto,
            UserImportDto,
            ImportResponse,
            ImportRunResponse,
            PublicationStatsDto,
            NamedCount,
            ChartSeries,
            CategoryTotalDto,
            RequestSummaryDto,
            MemberDashboardResponse,
            FundUsageDto,
            AdminDashboardResponse,
        )
    ),
    tags(
        (name = "system", description = "System health"),
        (name = "auth", description = "Login and sessions"),
        (name = "years", description = "Budget years"),
        (name = "funds", description = "Fund categories, subcategories and budget lines"),
        (name = "requests", description = "Fund requests"),
        (name = "reviews", description = "Department and final review"),
        (name = "announcements", description = "Portal announcements"),
        (name = "publications", description = "Publication imports and summaries"),
        (name = "dashboard", description = "Dashboard statistics"),
        (name = "users", description = "Accounts and departments"),
    )
)]
pub struct ApiDoc;
