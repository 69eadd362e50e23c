//! Integration tests for RequestRepository.

use grantdesk_core::{
    AppError, FundRequestDraft, NewFundRequest, NewReview, RequestStatus, ReviewDecision,
    ReviewStage, Role, summarize_requests,
};
use grantdesk_db::{FundRepository, RequestFilter, RequestRepository};

use crate::integration::common::{FundFixture, create_user, seed_funds, setup_test_db};

fn new_request(user_id: i64, fixture: &FundFixture, amount: i64) -> NewFundRequest {
    NewFundRequest {
        user_id,
        year_id: fixture.year_id,
        subcategory_id: fixture.subcategory_id,
        budget_level: Some("international".to_string()),
        title: "ICSE 2026 travel".to_string(),
        details: None,
        requested_amount: amount,
    }
}

#[tokio::test]
async fn test_create_starts_as_draft() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let teacher = create_user(&pool, "t@uni.edu", Role::Teacher, None).await;
    let repo = RequestRepository::new(pool);

    let request = repo
        .create(&new_request(teacher.id, &fixture, 15_000))
        .await
        .expect("create should succeed");

    assert_eq!(request.status, RequestStatus::Draft);
    assert_eq!(request.submitted_at, None);
    assert_eq!(request.approved_amount, None);
}

#[tokio::test]
async fn test_transition_is_compare_and_set() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let teacher = create_user(&pool, "t@uni.edu", Role::Teacher, None).await;
    let repo = RequestRepository::new(pool);
    let request = repo
        .create(&new_request(teacher.id, &fixture, 15_000))
        .await
        .expect("create");

    let first = repo
        .transition(request.id, RequestStatus::Draft, RequestStatus::Submitted)
        .await
        .expect("transition");
    let second = repo
        .transition(request.id, RequestStatus::Draft, RequestStatus::Submitted)
        .await
        .expect("transition");

    assert!(first);
    assert!(!second, "request is no longer a draft");

    let submitted = repo.require(request.id).await.expect("get");
    assert_eq!(submitted.status, RequestStatus::Submitted);
    assert!(submitted.submitted_at.is_some());
}

#[tokio::test]
async fn test_submitted_request_cannot_be_edited() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let teacher = create_user(&pool, "t@uni.edu", Role::Teacher, None).await;
    let repo = RequestRepository::new(pool);
    let request = repo
        .create(&new_request(teacher.id, &fixture, 15_000))
        .await
        .expect("create");

    let draft = FundRequestDraft {
        subcategory_id: fixture.subcategory_id,
        budget_level: Some("international".into()),
        title: "ICSE 2026 travel and registration".into(),
        details: Some("Two nights".into()),
        requested_amount: 18_000,
    };
    let edited = repo.update_draft(request.id, &draft).await.expect("edit draft");
    assert_eq!(edited.requested_amount, 18_000);

    // Saving the same values again is not an error.
    repo.update_draft(request.id, &draft).await.expect("idempotent edit");

    repo.transition(request.id, RequestStatus::Draft, RequestStatus::Submitted)
        .await
        .expect("submit");
    let result = repo.update_draft(request.id, &draft).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_review_chain_counts_toward_usage() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let teacher = create_user(&pool, "t@uni.edu", Role::Teacher, None).await;
    let head = create_user(&pool, "h@uni.edu", Role::DeptHead, None).await;
    let admin = create_user(&pool, "a@uni.edu", Role::Admin, None).await;
    let repo = RequestRepository::new(pool.clone());

    let request = repo
        .create(&new_request(teacher.id, &fixture, 15_000))
        .await
        .expect("create");
    repo.transition(request.id, RequestStatus::Draft, RequestStatus::Submitted)
        .await
        .expect("submit");

    repo.apply_review(
        &NewReview {
            request_id: request.id,
            reviewer_id: head.id,
            stage: ReviewStage::DeptHead,
            decision: ReviewDecision::Approve,
            comment: Some("Fine".into()),
            approved_amount: None,
        },
        RequestStatus::Submitted,
        RequestStatus::DeptApproved,
    )
    .await
    .expect("dept review");

    let approved = repo
        .apply_review(
            &NewReview {
                request_id: request.id,
                reviewer_id: admin.id,
                stage: ReviewStage::Admin,
                decision: ReviewDecision::Approve,
                comment: None,
                approved_amount: Some(12_000),
            },
            RequestStatus::DeptApproved,
            RequestStatus::Approved,
        )
        .await
        .expect("admin review");

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.approved_amount, Some(12_000));
    assert!(approved.decided_at.is_some());

    let reviews = repo.reviews_for(request.id).await.expect("reviews");
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].stage, ReviewStage::DeptHead);
    assert_eq!(reviews[1].stage, ReviewStage::Admin);

    let usage = FundRepository::new(pool)
        .usage_by_subcategory(fixture.year_id)
        .await
        .expect("usage");
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].budget_level.as_deref(), Some("international"));
    assert_eq!(usage[0].approved_count, 1);
    assert_eq!(usage[0].approved_amount, 12_000);
}

#[tokio::test]
async fn test_stale_review_is_rejected_without_side_effects() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let teacher = create_user(&pool, "t@uni.edu", Role::Teacher, None).await;
    let admin = create_user(&pool, "a@uni.edu", Role::Admin, None).await;
    let repo = RequestRepository::new(pool);
    let request = repo
        .create(&new_request(teacher.id, &fixture, 15_000))
        .await
        .expect("create");

    let result = repo
        .apply_review(
            &NewReview {
                request_id: request.id,
                reviewer_id: admin.id,
                stage: ReviewStage::Admin,
                decision: ReviewDecision::Reject,
                comment: None,
                approved_amount: None,
            },
            RequestStatus::DeptApproved,
            RequestStatus::Rejected,
        )
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(repo.reviews_for(request.id).await.expect("reviews").is_empty());
}

#[tokio::test]
async fn test_list_filters_and_dashboard_rows() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let dept = grantdesk_db::UserRepository::new(pool.clone())
        .create_department("Chemistry")
        .await
        .expect("department");
    let alice = create_user(&pool, "alice@uni.edu", Role::Teacher, Some(dept.id)).await;
    let bob = create_user(&pool, "bob@uni.edu", Role::Teacher, None).await;
    let repo = RequestRepository::new(pool);

    let a1 = repo.create(&new_request(alice.id, &fixture, 1_000)).await.expect("a1");
    repo.create(&new_request(alice.id, &fixture, 2_000)).await.expect("a2");
    repo.create(&new_request(bob.id, &fixture, 4_000)).await.expect("b1");
    repo.transition(a1.id, RequestStatus::Draft, RequestStatus::Submitted)
        .await
        .expect("submit");

    let mine = repo.list(&RequestFilter::for_user(alice.id)).await.expect("list");
    assert_eq!(mine.len(), 2);

    let dept_queue = repo
        .list(&RequestFilter {
            department_id: Some(dept.id),
            status: Some(RequestStatus::Submitted),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(dept_queue.len(), 1);
    assert_eq!(dept_queue[0].id, a1.id);

    let rows = repo
        .dashboard_rows(&RequestFilter::default().with_year(fixture.year_id))
        .await
        .expect("rows");
    let summary = summarize_requests(&rows);
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.requested_total, 1_000, "drafts are not counted");
    assert_eq!(summary.pending_review, 1);
}
