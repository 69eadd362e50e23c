//! End-to-end request lifecycle against MySQL.

use axum::http::{StatusCode, header};
use serde_json::json;

use grantdesk_core::Role;
use grantdesk_db::UserRepository;

use super::common::{PASSWORD, app, create_user, login, send, setup_test_db};

/// Creates the current year with one teacher fund: 5000 overall for two
/// grants, at most 3000 per international grant. Returns the subcategory id.
async fn seed_funds(app: &axum::Router, admin: &str) -> i64 {
    let year = send(app, "POST", "/api/v1/years", Some(admin), Some(json!({"year": 2026, "budget": 100000}))).await;
    assert_eq!(year.status, StatusCode::CREATED, "{}", year.body);
    let year_id = year.body["id"].as_i64().unwrap();

    let current = send(app, "POST", &format!("/api/v1/years/{}/current", year_id), Some(admin), None).await;
    assert_eq!(current.status, StatusCode::OK, "{}", current.body);

    let category = send(
        app,
        "POST",
        "/api/v1/funds/categories",
        Some(admin),
        Some(json!({"year_id": year_id, "name": "Research support"})),
    )
    .await;
    assert_eq!(category.status, StatusCode::CREATED, "{}", category.body);

    let subcategory = send(
        app,
        "POST",
        "/api/v1/funds/subcategories",
        Some(admin),
        Some(json!({
            "category_id": category.body["id"],
            "name": "Conference travel",
            "target_roles": ["teacher", "dept_head"]
        })),
    )
    .await;
    assert_eq!(subcategory.status, StatusCode::CREATED, "{}", subcategory.body);
    let subcategory_id = subcategory.body["id"].as_i64().unwrap();

    for line in [
        json!({"subcategory_id": subcategory_id, "scope": "overall", "amount": 5000, "max_grants": 2}),
        json!({"subcategory_id": subcategory_id, "scope": "per_grant", "level": "international", "amount": 3000}),
    ] {
        let created = send(app, "POST", "/api/v1/funds/lines", Some(admin), Some(line)).await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    }

    subcategory_id
}

#[tokio::test]
async fn test_request_goes_through_both_review_stages() {
    let (pool, _container) = setup_test_db().await;
    let users = UserRepository::new(pool.clone());
    let department = users.create_department("Physics").await.unwrap();

    create_user(&pool, "admin@uni.edu", Role::SuperAdmin, None).await;
    create_user(&pool, "head@uni.edu", Role::DeptHead, Some(department.id)).await;
    create_user(&pool, "teacher@uni.edu", Role::Teacher, Some(department.id)).await;

    let app = app(pool);
    let admin = login(&app, "admin@uni.edu").await;
    let head = login(&app, "head@uni.edu").await;
    let teacher = login(&app, "teacher@uni.edu").await;
    let subcategory_id = seed_funds(&app, &admin).await;

    let created = send(
        &app,
        "POST",
        "/api/v1/requests",
        Some(&teacher),
        Some(json!({
            "subcategory_id": subcategory_id,
            "budget_level": "international",
            "title": "ICML registration",
            "requested_amount": 2500
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["status"], "draft");
    let id = created.body["id"].as_i64().unwrap();

    let submitted = send(&app, "POST", &format!("/api/v1/requests/{}/submit", id), Some(&teacher), None).await;
    assert_eq!(submitted.status, StatusCode::OK, "{}", submitted.body);
    assert_eq!(submitted.body["status"], "submitted");

    // Only the department stage may act now
    let early = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/review", id),
        Some(&admin),
        Some(json!({"decision": "approve"})),
    )
    .await;
    assert_eq!(early.status, StatusCode::CONFLICT, "{}", early.body);

    let queue = send(&app, "GET", "/api/v1/reviews/pending", Some(&head), None).await;
    assert_eq!(queue.status, StatusCode::OK);
    assert_eq!(queue.body.as_array().unwrap().len(), 1);

    let dept = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/review", id),
        Some(&head),
        Some(json!({"decision": "approve", "comment": "Relevant venue"})),
    )
    .await;
    assert_eq!(dept.status, StatusCode::OK, "{}", dept.body);
    assert_eq!(dept.body["status"], "dept_approved");

    let final_review = send(
        &app,
        "POST",
        &format!("/api/v1/requests/{}/review", id),
        Some(&admin),
        Some(json!({"decision": "approve", "approved_amount": 2000})),
    )
    .await;
    assert_eq!(final_review.status, StatusCode::OK, "{}", final_review.body);
    assert_eq!(final_review.body["status"], "approved");
    assert_eq!(final_review.body["approved_amount"], 2000);

    let detail = send(&app, "GET", &format!("/api/v1/requests/{}", id), Some(&teacher), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["reviews"].as_array().unwrap().len(), 2);

    let funds = send(&app, "GET", "/api/v1/funds/available", Some(&teacher), None).await;
    assert_eq!(funds.status, StatusCode::OK);
    let fund = &funds.body["categories"][0]["subcategories"][0];
    assert_eq!(fund["used_amount"], 2000);
    assert_eq!(fund["remaining_amount"], 3000);
}

#[tokio::test]
async fn test_request_over_level_ceiling_is_rejected() {
    let (pool, _container) = setup_test_db().await;
    create_user(&pool, "admin@uni.edu", Role::Admin, None).await;
    create_user(&pool, "teacher@uni.edu", Role::Teacher, None).await;

    let app = app(pool);
    let admin = login(&app, "admin@uni.edu").await;
    let teacher = login(&app, "teacher@uni.edu").await;
    let subcategory_id = seed_funds(&app, &admin).await;

    let reply = send(
        &app,
        "POST",
        "/api/v1/requests",
        Some(&teacher),
        Some(json!({
            "subcategory_id": subcategory_id,
            "budget_level": "international",
            "title": "Too expensive",
            "requested_amount": 3500
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", reply.body);
    assert_eq!(reply.body["error"], "budget_exceeded");
}

#[tokio::test]
async fn test_role_guards_and_page_login() {
    let (pool, _container) = setup_test_db().await;
    create_user(&pool, "teacher@uni.edu", Role::Teacher, None).await;

    let app = app(pool);
    let teacher = login(&app, "teacher@uni.edu").await;

    let years = send(&app, "POST", "/api/v1/years", Some(&teacher), Some(json!({"year": 2026, "budget": 1}))).await;
    assert_eq!(years.status, StatusCode::FORBIDDEN);

    let admin_page = send(&app, "GET", "/admin", Some(&teacher), None).await;
    assert_eq!(admin_page.status, StatusCode::FORBIDDEN);
    assert!(admin_page.body.as_str().unwrap().contains("403"));

    let dashboard = send(&app, "GET", "/dashboard", Some(&teacher), None).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.as_str().unwrap().contains("No current budget year"));

    let wrong = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "teacher@uni.edu", "password": "wrong password"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(wrong.header(header::SET_COOKIE).is_none());

    let logout = send(&app, "POST", "/api/v1/auth/logout", Some(&teacher), None).await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);
    let me = send(&app, "GET", "/api/v1/auth/me", Some(&teacher), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_final_approval_amount_must_fit_the_request() {
    let (pool, _container) = setup_test_db().await;
    let users = UserRepository::new(pool.clone());
    let department = users.create_department("Chemistry").await.unwrap();

    create_user(&pool, "admin@uni.edu", Role::Admin, None).await;
    create_user(&pool, "head@uni.edu", Role::DeptHead, Some(department.id)).await;
    create_user(&pool, "teacher@uni.edu", Role::Teacher, Some(department.id)).await;

    let app = app(pool);
    let admin = login(&app, "admin@uni.edu").await;
    let head = login(&app, "head@uni.edu").await;
    let teacher = login(&app, "teacher@uni.edu").await;
    let subcategory_id = seed_funds(&app, &admin).await;

    let created = send(
        &app,
        "POST",
        "/api/v1/requests",
        Some(&teacher),
        Some(json!({
            "subcategory_id": subcategory_id,
            "budget_level": "international",
            "title": "Workshop fee",
            "requested_amount": 1500
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["id"].as_i64().unwrap();
    let review_path = format!("/api/v1/requests/{}/review", id);

    let submitted = send(&app, "POST", &format!("/api/v1/requests/{}/submit", id), Some(&teacher), None).await;
    assert_eq!(submitted.status, StatusCode::OK, "{}", submitted.body);
    let dept = send(&app, "POST", &review_path, Some(&head), Some(json!({"decision": "approve"}))).await;
    assert_eq!(dept.body["status"], "dept_approved", "{}", dept.body);

    for amount in [1501, 0, -10] {
        let reply = send(
            &app,
            "POST",
            &review_path,
            Some(&admin),
            Some(json!({"decision": "approve", "approved_amount": amount})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "amount {}: {}", amount, reply.body);
        assert_eq!(reply.body["error"], "bad_request");
    }

    // Rejected amounts leave the request waiting for the final review
    let detail = send(&app, "GET", &format!("/api/v1/requests/{}", id), Some(&teacher), None).await;
    assert_eq!(detail.body["status"], "dept_approved");

    let approved = send(&app, "POST", &review_path, Some(&admin), Some(json!({"decision": "approve"}))).await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
    assert_eq!(approved.body["approved_amount"], 1500);
}

#[tokio::test]
async fn test_inactive_account_cannot_log_in() {
    let (pool, _container) = setup_test_db().await;
    let teacher = create_user(&pool, "teacher@uni.edu", Role::Teacher, None).await;

    let app = app(pool.clone());
    let session = login(&app, "teacher@uni.edu").await;

    UserRepository::new(pool)
        .set_active(teacher.id, false)
        .await
        .expect("deactivate");

    let api = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "teacher@uni.edu", "password": PASSWORD})),
    )
    .await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED, "{}", api.body);
    assert!(api.header(header::SET_COOKIE).is_none());

    let me = send(&app, "GET", "/api/v1/auth/me", Some(&session), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}
