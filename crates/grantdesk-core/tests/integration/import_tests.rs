//! Integration tests for ImportService.

use std::sync::atomic::Ordering;

use grantdesk_core::{
    AppError, ImportConfig, ImportService, ImportTarget, PublicationSource, SilentReporter,
};

use crate::integration::common::{MockFetcher, MockPublicationStore, remote};

const AUTHOR: &str = "57190000001";

#[tokio::test]
async fn test_import_creates_publications() {
    // Arrange
    let fetcher = MockFetcher::new(PublicationSource::Scopus).with_author(
        AUTHOR,
        vec![remote("85-1", "Compilers", 10), remote("85-2", "Linkers", 2)],
    );
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    // Act
    let stats = service.import_for_user(1, AUTHOR).await.unwrap();

    // Assert
    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.unchanged, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(store.len(), 2);

    let stored = store.get(1, PublicationSource::Scopus, "85-1").unwrap();
    assert_eq!(stored.title, "Compilers");
    assert_eq!(stored.citation_count, 10);
    assert_eq!(stored.content_hash.len(), 64);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus)
        .with_author(AUTHOR, vec![remote("85-1", "Compilers", 10)]);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    service.import_for_user(1, AUTHOR).await.unwrap();
    let upserts_after_first = store.upserts.load(Ordering::Relaxed);
    let stats = service.import_for_user(1, AUTHOR).await.unwrap();

    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.created + stats.updated, 0);
    assert_eq!(
        store.upserts.load(Ordering::Relaxed),
        upserts_after_first,
        "unchanged publications must not be rewritten"
    );
}

#[tokio::test]
async fn test_changed_citations_are_updated() {
    let fetcher = MockFetcher::new(PublicationSource::Scholar)
        .with_author(AUTHOR, vec![remote("abc:1", "Compilers", 10)]);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher.clone());

    service.import_for_user(1, AUTHOR).await.unwrap();
    fetcher.set_author(
        AUTHOR,
        vec![remote("abc:1", "Compilers", 11), remote("abc:2", "Loaders", 0)],
    );
    let stats = service.import_for_user(1, AUTHOR).await.unwrap();

    assert_eq!(stats.updated, 1);
    assert_eq!(stats.created, 1);
    assert_eq!(
        store
            .get(1, PublicationSource::Scholar, "abc:1")
            .unwrap()
            .citation_count,
        11
    );
}

#[tokio::test]
async fn test_added_doi_is_an_update() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus)
        .with_author(AUTHOR, vec![remote("85-1", "Compilers", 10)]);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher.clone());

    service.import_for_user(1, AUTHOR).await.unwrap();

    let mut with_doi = remote("85-1", "Compilers", 10);
    with_doi.doi = Some("10.1145/3591234".to_string());
    fetcher.set_author(AUTHOR, vec![with_doi]);
    let stats = service.import_for_user(1, AUTHOR).await.unwrap();

    assert_eq!(stats.updated, 1);
    assert_eq!(stats.unchanged, 0);
    assert_eq!(
        store
            .get(1, PublicationSource::Scopus, "85-1")
            .unwrap()
            .doi
            .as_deref(),
        Some("10.1145/3591234")
    );
}

#[tokio::test]
async fn test_repeated_entries_are_imported_once() {
    // The same citation id on two pages, with drifting citation counts
    let fetcher = MockFetcher::new(PublicationSource::Scholar).with_author(
        AUTHOR,
        vec![
            remote("abc:1", "Compilers", 10),
            remote("abc:2", "Loaders", 1),
            remote("abc:1", "Compilers", 12),
        ],
    );
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    let first = service.import_for_user(1, AUTHOR).await.unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.total(), 2);
    assert_eq!(store.len(), 2);
    assert_eq!(
        store
            .get(1, PublicationSource::Scholar, "abc:1")
            .unwrap()
            .citation_count,
        10
    );

    let second = service.import_for_user(1, AUTHOR).await.unwrap();
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.created + second.updated, 0);
}

#[tokio::test]
async fn test_import_is_scoped_per_user() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus)
        .with_author(AUTHOR, vec![remote("85-1", "Shared paper", 1)]);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    service.import_for_user(1, AUTHOR).await.unwrap();
    let stats = service.import_for_user(2, AUTHOR).await.unwrap();

    assert_eq!(stats.created, 1, "co-author gets their own row");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_import_records_run() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus)
        .with_author(AUTHOR, vec![remote("85-1", "Compilers", 10)]);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    service.import_for_user(3, AUTHOR).await.unwrap();

    let runs = store.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].user_id, 3);
    assert_eq!(runs[0].source, PublicationSource::Scopus);
    assert_eq!(runs[0].created, 1);
    assert!(runs[0].error.is_none());
    assert!(runs[0].finished_at >= runs[0].started_at);
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_propagated() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus).failing_for(AUTHOR);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    let err = service.import_for_user(1, AUTHOR).await.unwrap_err();
    assert!(matches!(err, AppError::NetworkError(_)));

    let runs = store.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].error.as_deref().unwrap().contains("connection reset"));
    assert_eq!(runs[0].created, 0);
}

#[tokio::test]
async fn test_blank_author_id_is_rejected_without_fetching() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus);
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher.clone());

    let err = service.import_for_user(1, "   ").await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(fetcher.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_single_upsert_failure_does_not_abort() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus).with_author(
        AUTHOR,
        vec![
            remote("85-1", "Good", 1),
            remote("85-bad", "Bad", 1),
            remote("85-3", "Also good", 1),
        ],
    );
    let store = MockPublicationStore::new().failing_upsert_for("85-bad");
    let config = ImportConfig::default().with_concurrency(2);
    let service = ImportService::with_config(store.clone(), fetcher, config);

    let stats = service.import_for_user(1, AUTHOR).await.unwrap();

    assert_eq!(stats.created, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total(), 3);
    assert_eq!(store.runs.lock().unwrap()[0].failed, 1);
}

#[tokio::test]
async fn test_batch_import_continues_after_failure() {
    let fetcher = MockFetcher::new(PublicationSource::Scopus)
        .with_author("a-1", vec![remote("1", "One", 0)])
        .with_author("a-3", vec![remote("3", "Three", 0), remote("4", "Four", 0)])
        .failing_for("a-2");
    let store = MockPublicationStore::new();
    let service = ImportService::new(store.clone(), fetcher);

    let targets = vec![
        ImportTarget {
            user_id: 1,
            author_id: "a-1".into(),
            label: "one@uni.edu".into(),
        },
        ImportTarget {
            user_id: 2,
            author_id: "a-2".into(),
            label: "two@uni.edu".into(),
        },
        ImportTarget {
            user_id: 3,
            author_id: "a-3".into(),
            label: "three@uni.edu".into(),
        },
    ];

    let summary = service
        .batch_import_with_progress(&targets, &SilentReporter)
        .await;

    assert_eq!(summary.total_users(), 3);
    assert_eq!(summary.successful_count(), 2);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.total_publications(), 3);
    assert!(!summary.results[1].is_success());
    assert_eq!(store.runs.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_batch_import_empty() {
    let service = ImportService::new(
        MockPublicationStore::new(),
        MockFetcher::new(PublicationSource::Scholar),
    );
    let summary = service.batch_import(&[]).await;
    assert_eq!(summary.total_users(), 0);
    assert_eq!(service.source(), PublicationSource::Scholar);
}
