//! Integration tests for users, sessions, years, funds and announcements.

use chrono::{Duration, Utc};
use grantdesk_core::{
    AnnouncementKind, AnnouncementStatus, AppError, NewAnnouncement, NewBudgetYear,
    NewFundCategory, PublicationSource, RecordStatus, Role, UserUpdate,
};
use grantdesk_db::{
    AnnouncementRepository, FundRepository, SessionRepository, UserRepository, YearRepository,
};

use crate::integration::common::{create_user, seed_funds, setup_test_db};

#[tokio::test]
async fn test_user_email_is_unique_and_case_insensitive() {
    let (pool, _container) = setup_test_db().await;
    let repo = UserRepository::new(pool.clone());

    let user = create_user(&pool, "Ada@Uni.edu", Role::Teacher, None).await;
    assert_eq!(user.email, "ada@uni.edu");

    let found = repo
        .find_by_email("ADA@uni.edu")
        .await
        .expect("lookup should succeed")
        .expect("user should exist");
    assert_eq!(found.id, user.id);

    let duplicate = repo
        .create(&grantdesk_core::NewUser {
            email: "ada@uni.edu".into(),
            password_hash: "x".into(),
            full_name: "Other".into(),
            role: Role::Staff,
            department_id: None,
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_user_update_and_author_ids() {
    let (pool, _container) = setup_test_db().await;
    let repo = UserRepository::new(pool.clone());
    let dept = repo.create_department("Physics").await.expect("department");
    let user = create_user(&pool, "bob@uni.edu", Role::Teacher, None).await;

    let updated = repo
        .update(
            user.id,
            &UserUpdate {
                department_id: Some(dept.id),
                scopus_author_id: Some(" 5719 ".into()),
                ..Default::default()
            },
        )
        .await
        .expect("update should succeed");

    assert_eq!(updated.department_id, Some(dept.id));
    assert_eq!(updated.scopus_author_id.as_deref(), Some("5719"));
    assert_eq!(updated.full_name, user.full_name);

    let with_scopus = repo
        .list_with_author_ids(PublicationSource::Scopus)
        .await
        .expect("list should succeed");
    assert_eq!(with_scopus.len(), 1);
    assert!(
        repo.list_with_author_ids(PublicationSource::Scholar)
            .await
            .expect("list should succeed")
            .is_empty()
    );
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (pool, _container) = setup_test_db().await;
    let sessions = SessionRepository::new(pool.clone());
    let user = create_user(&pool, "carol@uni.edu", Role::Admin, None).await;
    let now = Utc::now();

    sessions
        .create("a".repeat(64).as_str(), user.id, now + Duration::hours(8))
        .await
        .expect("create session");
    sessions
        .create("b".repeat(64).as_str(), user.id, now - Duration::hours(1))
        .await
        .expect("create expired session");

    let resolved = sessions
        .find_user_by_token(&"a".repeat(64), now)
        .await
        .expect("lookup should succeed");
    assert_eq!(resolved.map(|u| u.id), Some(user.id));

    let expired = sessions
        .find_user_by_token(&"b".repeat(64), now)
        .await
        .expect("lookup should succeed");
    assert!(expired.is_none());

    assert_eq!(sessions.purge_expired(now).await.expect("purge"), 1);

    UserRepository::new(pool.clone())
        .set_active(user.id, false)
        .await
        .expect("deactivate");
    let inactive = sessions
        .find_user_by_token(&"a".repeat(64), now)
        .await
        .expect("lookup should succeed");
    assert!(inactive.is_none(), "deactivated users lose their sessions");
}

#[tokio::test]
async fn test_only_one_current_year() {
    let (pool, _container) = setup_test_db().await;
    let years = YearRepository::new(pool);
    let new_year = |year| NewBudgetYear {
        year,
        budget: 500_000,
        status: RecordStatus::Active,
    };

    let y2025 = years.create(&new_year(2025)).await.expect("create 2025");
    let y2026 = years.create(&new_year(2026)).await.expect("create 2026");

    years.set_current(y2025.id).await.expect("set 2025");
    years.set_current(y2026.id).await.expect("set 2026");

    let current = years.current().await.expect("current").expect("a current year");
    assert_eq!(current.id, y2026.id);
    assert!(!years.require(y2025.id).await.expect("2025").is_current);

    let duplicate = years.create(&new_year(2026)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_year_with_categories_cannot_be_deleted() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let years = YearRepository::new(pool);

    let result = years.delete(fixture.year_id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let missing = years.delete(9_999).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_fund_tree_rows_and_roles() {
    let (pool, _container) = setup_test_db().await;
    let fixture = seed_funds(&pool).await;
    let funds = FundRepository::new(pool);

    let rows = funds
        .load_tree_rows(fixture.year_id)
        .await
        .expect("load should succeed");

    assert_eq!(rows.categories.len(), 1);
    assert_eq!(rows.subcategories.len(), 1);
    assert_eq!(rows.budget_lines.len(), 1);
    assert_eq!(
        rows.subcategories[0].target_roles,
        vec![Role::Teacher, Role::DeptHead]
    );
    assert_eq!(rows.budget_lines[0].amount, 20_000);

    assert_eq!(
        funds
            .year_of_subcategory(fixture.subcategory_id)
            .await
            .expect("lookup"),
        Some(fixture.year_id)
    );

    let usage = funds
        .usage_by_subcategory(fixture.year_id)
        .await
        .expect("usage should succeed");
    assert!(usage.is_empty(), "no approved requests yet");
}

#[tokio::test]
async fn test_category_for_unknown_year_is_conflict() {
    let (pool, _container) = setup_test_db().await;
    let funds = FundRepository::new(pool);

    let result = funds
        .create_category(&NewFundCategory {
            year_id: 42,
            name: "Orphan".into(),
            description: None,
            status: RecordStatus::Active,
            sort_order: 0,
        })
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_announcement_visibility() {
    let (pool, _container) = setup_test_db().await;
    let admin = create_user(&pool, "admin@uni.edu", Role::Admin, None).await;
    let repo = AnnouncementRepository::new(pool);
    let now = Utc::now();

    let base = NewAnnouncement {
        title: "Travel grants open".into(),
        content: "Submit by March".into(),
        kind: AnnouncementKind::Fund,
        status: AnnouncementStatus::Published,
        published_at: None,
        expires_at: None,
        attachment_url: None,
    };

    let live = repo.create(&base, admin.id).await.expect("create live");
    assert!(live.published_at.is_some());

    repo.create(
        &NewAnnouncement {
            status: AnnouncementStatus::Draft,
            title: "Draft".into(),
            ..base.clone()
        },
        admin.id,
    )
    .await
    .expect("create draft");

    repo.create(
        &NewAnnouncement {
            title: "Old".into(),
            published_at: Some(now - Duration::days(10)),
            expires_at: Some(now - Duration::days(1)),
            ..base.clone()
        },
        admin.id,
    )
    .await
    .expect("create expired");

    let visible = repo
        .list_visible(now + Duration::seconds(5))
        .await
        .expect("list should succeed");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, live.id);

    assert_eq!(repo.list_all().await.expect("list all").len(), 3);

    repo.delete(live.id).await.expect("delete");
    assert!(matches!(
        repo.delete(live.id).await,
        Err(AppError::NotFound(_))
    ));
}
