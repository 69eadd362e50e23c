//! Publication import service.
//!
//! [`ImportService`] pulls an author's publication list from a
//! [`PublicationFetcher`], compares each entry against the stored content
//! hash and writes only what changed through a [`PublicationStore`]. Every
//! run, successful or not, leaves an `import_runs` row behind.

use std::collections::HashSet;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::config::ImportConfig;
use crate::delta::{BatchImportSummary, ImportOutcome, ImportStats, UserImportResult, needs_update};
use crate::error::AppError;
use crate::models::{NewImportRun, PublicationSource, RemotePublication};
use crate::progress::{ImportEvent, ImportReporter, SilentReporter};
use crate::traits::{PublicationFetcher, PublicationStore};

/// One user to import in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub user_id: i64,
    pub author_id: String,
    /// Shown in progress output, usually the email.
    pub label: String,
}

/// Service importing publications from one source.
///
/// # Example
///
/// ```ignore
/// let service = ImportService::new(publication_repo, scopus_client);
/// let stats = service.import_for_user(42, "57190000000").await?;
/// println!("{} new, {} updated", stats.created, stats.updated);
/// ```
#[derive(Clone)]
pub struct ImportService<S, F>
where
    S: PublicationStore,
    F: PublicationFetcher,
{
    store: S,
    fetcher: F,
    config: ImportConfig,
}

impl<S, F> ImportService<S, F>
where
    S: PublicationStore,
    F: PublicationFetcher,
{
    pub fn new(store: S, fetcher: F) -> Self {
        Self::with_config(store, fetcher, ImportConfig::default())
    }

    pub fn with_config(store: S, fetcher: F, config: ImportConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn source(&self) -> PublicationSource {
        self.fetcher.source()
    }

    /// Imports one user's publications.
    pub async fn import_for_user(
        &self,
        user_id: i64,
        author_id: &str,
    ) -> Result<ImportStats, AppError> {
        self.import_for_user_with_progress(user_id, author_id, &SilentReporter)
            .await
    }

    /// Same as [`import_for_user`](Self::import_for_user), emitting progress
    /// events through `reporter`.
    ///
    /// A failure to fetch or to read existing hashes is recorded on the
    /// import run and then returned. Failures on individual publications
    /// are counted in `failed` and do not abort the run.
    pub async fn import_for_user_with_progress<R: ImportReporter>(
        &self,
        user_id: i64,
        author_id: &str,
        reporter: &R,
    ) -> Result<ImportStats, AppError> {
        let source = self.fetcher.source();
        let started_at = Utc::now();

        let result = self.run_import(user_id, author_id, source, reporter).await;

        let (stats, error) = match &result {
            Ok(stats) => (*stats, None),
            Err(e) => (ImportStats::default(), Some(e.to_string())),
        };
        let run = NewImportRun {
            user_id,
            source,
            started_at,
            finished_at: Utc::now(),
            created: count(stats.created),
            updated: count(stats.updated),
            unchanged: count(stats.unchanged),
            failed: count(stats.failed),
            error,
        };
        if let Err(e) = self.store.record_import_run(&run).await {
            tracing::warn!(user_id, error = %e, "Failed to record import run");
        }

        result
    }

    async fn run_import<R: ImportReporter>(
        &self,
        user_id: i64,
        author_id: &str,
        source: PublicationSource,
        reporter: &R,
    ) -> Result<ImportStats, AppError> {
        let author_id = author_id.trim();
        if author_id.is_empty() {
            return Err(AppError::Validation(format!(
                "user {} has no {} author id",
                user_id, source
            )));
        }

        let remote = dedupe_by_external_id(self.fetcher.fetch_by_author(author_id).await?);
        reporter.report(ImportEvent::Fetched {
            user_id,
            source,
            count: remote.len(),
        });

        let existing = self.store.get_hashes(user_id, source).await?;

        let outcomes: Vec<ImportOutcome> = stream::iter(remote)
            .map(|item| {
                let publication = item.into_new_publication(user_id, source);
                let decision = needs_update(
                    existing
                        .get(&publication.external_id)
                        .map(String::as_str),
                    &publication.content_hash,
                );
                async move {
                    if !decision.needs_write {
                        return decision.outcome;
                    }
                    match self.store.upsert(&publication).await {
                        Ok(()) => decision.outcome,
                        Err(e) => {
                            let error = e.to_string();
                            reporter.report(ImportEvent::PublicationFailed {
                                user_id,
                                external_id: &publication.external_id,
                                error: &error,
                            });
                            ImportOutcome::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut stats = ImportStats::new();
        for outcome in outcomes {
            stats.record(outcome);
        }
        Ok(stats)
    }

    /// Imports several users one after the other.
    pub async fn batch_import(&self, targets: &[ImportTarget]) -> BatchImportSummary {
        self.batch_import_with_progress(targets, &SilentReporter)
            .await
    }

    /// Imports several users, continuing past per-user failures.
    pub async fn batch_import_with_progress<R: ImportReporter>(
        &self,
        targets: &[ImportTarget],
        reporter: &R,
    ) -> BatchImportSummary {
        reporter.report(ImportEvent::BatchStarted {
            total_users: targets.len(),
        });

        let mut summary = BatchImportSummary::new();
        for (index, target) in targets.iter().enumerate() {
            reporter.report(ImportEvent::UserStarted {
                index,
                total: targets.len(),
                user_id: target.user_id,
                label: &target.label,
            });

            match self
                .import_for_user_with_progress(target.user_id, &target.author_id, reporter)
                .await
            {
                Ok(stats) => {
                    reporter.report(ImportEvent::UserCompleted {
                        user_id: target.user_id,
                        stats: &stats,
                    });
                    summary.add(UserImportResult::success(
                        target.user_id,
                        target.label.clone(),
                        stats,
                    ));
                }
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(ImportEvent::UserFailed {
                        user_id: target.user_id,
                        error: &error,
                    });
                    summary.add(UserImportResult::failure(
                        target.user_id,
                        target.label.clone(),
                        error,
                    ));
                }
            }
        }

        reporter.report(ImportEvent::BatchCompleted { summary: &summary });
        summary
    }
}

/// Keeps the first entry for each external id. Paginated sources may repeat
/// an entry across pages.
fn dedupe_by_external_id(remote: Vec<RemotePublication>) -> Vec<RemotePublication> {
    let fetched = remote.len();
    let mut seen = HashSet::with_capacity(fetched);
    let unique: Vec<RemotePublication> = remote
        .into_iter()
        .filter(|p| seen.insert(p.external_id.clone()))
        .collect();
    if unique.len() < fetched {
        tracing::debug!(duplicates = fetched - unique.len(), "Dropped repeated entries");
    }
    unique
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
