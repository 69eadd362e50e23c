//! Router configuration and route composition.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_cookies::CookieManagerLayer;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_page_session;
use crate::config::ServerConfig;
use crate::handlers::{
    announcements, auth, dashboard, funds, health, publications, requests, users, years,
};
use crate::openapi::ApiDoc;
use crate::pages;
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Years
        .route("/years", get(years::list_years).post(years::create_year))
        .route("/years/:id", put(years::update_year).delete(years::delete_year))
        .route("/years/:id/current", post(years::set_current_year))
        // Funds
        .route("/funds", get(funds::fund_tree))
        .route("/funds/available", get(funds::available_funds))
        .route("/funds/categories", post(funds::create_category))
        .route(
            "/funds/categories/:id",
            put(funds::update_category).delete(funds::delete_category),
        )
        .route("/funds/subcategories", post(funds::create_subcategory))
        .route(
            "/funds/subcategories/:id",
            put(funds::update_subcategory).delete(funds::delete_subcategory),
        )
        .route("/funds/lines", post(funds::create_budget_line))
        .route(
            "/funds/lines/:id",
            put(funds::update_budget_line).delete(funds::delete_budget_line),
        )
        // Requests and reviews
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route(
            "/requests/:id",
            get(requests::get_request).put(requests::update_request),
        )
        .route("/requests/:id/submit", post(requests::submit_request))
        .route("/requests/:id/withdraw", post(requests::withdraw_request))
        .route("/requests/:id/review", post(requests::review_request))
        .route("/reviews/pending", get(requests::pending_reviews))
        // Announcements
        .route(
            "/announcements",
            get(announcements::list_visible).post(announcements::create_announcement),
        )
        .route("/announcements/all", get(announcements::list_all))
        .route(
            "/announcements/:id",
            put(announcements::update_announcement).delete(announcements::delete_announcement),
        )
        // Publications
        .route("/publications", get(publications::list_publications))
        .route("/publications/:id", delete(publications::delete_publication))
        .route("/publications/summary", post(publications::my_summary))
        .route("/publications/import", post(publications::trigger_import))
        .route("/publications/imports", get(publications::list_import_runs))
        // Dashboards
        .route("/dashboard/me", get(dashboard::my_dashboard))
        .route("/dashboard/admin", get(dashboard::admin_dashboard))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", put(users::update_user))
        .route("/users/:id/active", post(users::set_user_active))
        .route("/users/:id/summary", post(publications::user_summary))
        .route(
            "/departments",
            get(users::list_departments).post(users::create_department),
        );

    // Pages behind the session gate
    let gated_pages = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/admin", get(pages::admin_home))
        .route("/admin/years", get(pages::admin_years))
        .route("/admin/funds", get(pages::admin_funds))
        .route("/admin/requests", get(pages::admin_requests))
        .route("/admin/announcements", get(pages::admin_announcements))
        .route("/admin/imports", get(pages::admin_imports))
        .route("/admin/users", get(pages::admin_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_page_session,
        ));

    let public_pages = Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route("/logout", get(pages::logout_page));

    let cors_layer = build_cors_layer(&config.cors_origins);

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .merge(public_pages)
        .merge(gated_pages)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware layers (order matters: bottom layers run first)
        .layer(CookieManagerLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // A zero rate disables limiting
    let router = if config.rate_limit_rps == 0 {
        router
    } else {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_rps.into())
            .burst_size(config.rate_limit_burst.max(1))
            .finish();
        match governor_config {
            // Arc required for cloning in layers
            Some(governor_config) => router.layer(GovernorLayer {
                config: Arc::new(governor_config),
            }),
            None => {
                tracing::warn!(
                    rps = config.rate_limit_rps,
                    burst = config.rate_limit_burst,
                    "Invalid rate limit configuration, rate limiting disabled"
                );
                router
            }
        }
    };

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// If `origins` is "*", allows any origin (for development).
/// Otherwise, parses comma-separated origins.
fn build_cors_layer(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600));

    if origins == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(allowed)
    }
}
