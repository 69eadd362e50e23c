//! Access control that is decided before any database work.

use axum::http::{StatusCode, header};

use super::common::{offline_app, send};

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let app = offline_app();

    let reply = send(&app, "GET", "/dashboard", None, None).await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.header(header::LOCATION), Some("/login?next=/dashboard"));
}

#[tokio::test]
async fn test_admin_page_redirect_keeps_query() {
    let app = offline_app();

    let reply = send(&app, "GET", "/admin/requests?status=submitted", None, None).await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(
        reply.header(header::LOCATION),
        Some("/login?next=/admin/requests%3Fstatus%3Dsubmitted")
    );
}

#[tokio::test]
async fn test_api_without_session_is_401_json() {
    let app = offline_app();

    for (method, uri) in [
        ("GET", "/api/v1/auth/me"),
        ("GET", "/api/v1/requests"),
        ("GET", "/api/v1/funds/available"),
        ("POST", "/api/v1/years/1/current"),
        ("GET", "/api/v1/users"),
    ] {
        let reply = send(&app, method, uri, None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(reply.body["error"], "unauthorized", "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_login_page_renders_form_with_next() {
    let app = offline_app();

    let reply = send(&app, "GET", "/login?next=/admin/funds", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    let html = reply.body.as_str().expect("html body");
    assert!(html.contains("<form method=\"post\" action=\"/login\">"));
    assert!(html.contains("value=\"/admin/funds\""));
}

#[tokio::test]
async fn test_login_page_drops_external_next() {
    let app = offline_app();

    let reply = send(&app, "GET", "/login?next=//evil.example", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    let html = reply.body.as_str().expect("html body");
    assert!(!html.contains("evil.example"));
}

#[tokio::test]
async fn test_root_without_session_goes_to_login() {
    let app = offline_app();

    let reply = send(&app, "GET", "/", None, None).await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.header(header::LOCATION), Some("/login"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = offline_app();

    let reply = send(&app, "GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["info"]["title"], "GrantDesk API");
    assert!(reply.body["paths"]["/api/v1/requests/{id}/submit"].is_object());
}
