//! Integration tests for PublicationRepository.

use chrono::Utc;
use grantdesk_core::{
    ImportService, NewImportRun, PublicationSource, PublicationStore, RemotePublication, Role,
};
use grantdesk_db::PublicationRepository;

use crate::integration::common::{create_user, setup_test_db};

fn remote(external_id: &str, title: &str, citations: i32) -> RemotePublication {
    RemotePublication {
        external_id: external_id.to_string(),
        title: title.to_string(),
        authors: "A. Author, B. Author".to_string(),
        venue: Some("Journal of Tests".to_string()),
        pub_year: Some(2025),
        doi: None,
        url: None,
        citation_count: citations,
    }
}

#[tokio::test]
async fn test_upsert_updates_on_natural_key() {
    let (pool, _container) = setup_test_db().await;
    let user = create_user(&pool, "p@uni.edu", Role::Teacher, None).await;
    let repo = PublicationRepository::new(pool);

    let first = remote("2-s2.0-1", "Paper", 3).into_new_publication(user.id, PublicationSource::Scopus);
    repo.upsert(&first).await.expect("insert");

    let second = remote("2-s2.0-1", "Paper", 9).into_new_publication(user.id, PublicationSource::Scopus);
    repo.upsert(&second).await.expect("update");

    let stored = repo.list_for_user(user.id, None).await.expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].citation_count, 9);
    assert_eq!(stored[0].content_hash, second.content_hash);

    let hashes = repo
        .get_hashes(user.id, PublicationSource::Scopus)
        .await
        .expect("hashes");
    assert_eq!(hashes.get("2-s2.0-1"), Some(&second.content_hash));
    assert!(
        repo.get_hashes(user.id, PublicationSource::Scholar)
            .await
            .expect("hashes")
            .is_empty()
    );
}

#[tokio::test]
async fn test_list_for_user_filters_by_year() {
    let (pool, _container) = setup_test_db().await;
    let user = create_user(&pool, "p@uni.edu", Role::Teacher, None).await;
    let repo = PublicationRepository::new(pool);

    let mut old = remote("a", "Older", 1);
    old.pub_year = Some(2019);
    repo.upsert(&old.into_new_publication(user.id, PublicationSource::Scholar))
        .await
        .expect("insert");
    repo.upsert(&remote("b", "Newer", 1).into_new_publication(user.id, PublicationSource::Scholar))
        .await
        .expect("insert");

    let in_2025 = repo.list_for_user(user.id, Some(2025)).await.expect("list");
    assert_eq!(in_2025.len(), 1);
    assert_eq!(in_2025[0].title, "Newer");
}

#[tokio::test]
async fn test_import_runs_and_stats() {
    let (pool, _container) = setup_test_db().await;
    let user = create_user(&pool, "p@uni.edu", Role::Teacher, None).await;
    let repo = PublicationRepository::new(pool);
    let now = Utc::now();

    repo.upsert(&remote("x", "Counted", 0).into_new_publication(user.id, PublicationSource::Scopus))
        .await
        .expect("insert");
    let run_id = PublicationStore::record_import_run(
        &repo,
        &NewImportRun {
            user_id: user.id,
            source: PublicationSource::Scopus,
            started_at: now,
            finished_at: now,
            created: 1,
            updated: 0,
            unchanged: 0,
            failed: 0,
            error: None,
        },
    )
    .await
    .expect("record run");
    assert!(run_id > 0);

    let runs = repo.recent_runs(Some(user.id), 10).await.expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].created, 1);

    let stats = repo.get_stats().await.expect("stats");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.users_with_publications, 1);
    assert_eq!(stats.by_source, vec![("scopus".to_string(), 1)]);
    assert!(stats.last_import.is_some());
}

/// The repository plugs into the import service as its store.
#[tokio::test]
async fn test_repository_backs_import_service() {
    let (pool, _container) = setup_test_db().await;
    let user = create_user(&pool, "p@uni.edu", Role::Teacher, None).await;
    let repo = PublicationRepository::new(pool);

    #[derive(Clone)]
    struct FixedFetcher;

    impl grantdesk_core::PublicationFetcher for FixedFetcher {
        fn source(&self) -> PublicationSource {
            PublicationSource::Scholar
        }

        async fn fetch_by_author(
            &self,
            _author_id: &str,
        ) -> Result<Vec<RemotePublication>, grantdesk_core::AppError> {
            Ok(vec![remote("s1", "One", 1), remote("s2", "Two", 2)])
        }
    }

    let service = ImportService::new(repo.clone(), FixedFetcher);
    let first = service.import_for_user(user.id, "abcDEF").await.expect("first import");
    let second = service.import_for_user(user.id, "abcDEF").await.expect("second import");

    assert_eq!(first.created, 2);
    assert_eq!(second.unchanged, 2);
    assert_eq!(repo.recent_runs(Some(user.id), 10).await.expect("runs").len(), 2);
}
