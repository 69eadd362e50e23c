//! Progress reporting for publication imports.
//!
//! Services emit [`ImportEvent`]s through an [`ImportReporter`], leaving the
//! presentation (log lines, nothing at all) to the caller.

use tracing::{info, warn};

use crate::delta::{BatchImportSummary, ImportStats};
use crate::models::PublicationSource;

/// Events emitted while importing publications.
#[derive(Debug, Clone)]
pub enum ImportEvent<'a> {
    /// A batch over several users is starting.
    BatchStarted { total_users: usize },
    /// Import for one user is starting.
    UserStarted {
        index: usize,
        total: usize,
        user_id: i64,
        label: &'a str,
    },
    /// The remote source answered.
    Fetched {
        user_id: i64,
        source: PublicationSource,
        count: usize,
    },
    /// One publication could not be stored.
    PublicationFailed {
        user_id: i64,
        external_id: &'a str,
        error: &'a str,
    },
    /// Import for one user finished.
    UserCompleted { user_id: i64, stats: &'a ImportStats },
    /// Import for one user aborted.
    UserFailed { user_id: i64, error: &'a str },
    /// The batch finished.
    BatchCompleted { summary: &'a BatchImportSummary },
}

/// Receives import progress events.
pub trait ImportReporter: Send + Sync {
    /// The default implementation does nothing.
    fn report(&self, event: ImportEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ImportReporter for SilentReporter {}

/// Reporter that writes events as `tracing` log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ImportReporter for TracingReporter {
    fn report(&self, event: ImportEvent<'_>) {
        match event {
            ImportEvent::BatchStarted { total_users } => {
                info!(total_users, "Starting batch import");
            }
            ImportEvent::UserStarted {
                index,
                total,
                user_id,
                label,
            } => {
                info!(user_id, "[{}/{}] Importing publications for {}", index + 1, total, label);
            }
            ImportEvent::Fetched {
                user_id,
                source,
                count,
            } => {
                info!(user_id, %source, count, "Fetched publications");
            }
            ImportEvent::PublicationFailed {
                user_id,
                external_id,
                error,
            } => {
                warn!(user_id, external_id, error, "Failed to store publication");
            }
            ImportEvent::UserCompleted { user_id, stats } => {
                info!(
                    user_id,
                    created = stats.created,
                    updated = stats.updated,
                    unchanged = stats.unchanged,
                    failed = stats.failed,
                    "Import complete"
                );
            }
            ImportEvent::UserFailed { user_id, error } => {
                warn!(user_id, error, "Import failed");
            }
            ImportEvent::BatchCompleted { summary } => {
                info!(
                    users = summary.total_users(),
                    successful = summary.successful_count(),
                    failed = summary.failed_count(),
                    publications = summary.total_publications(),
                    "Batch import complete"
                );
            }
        }
    }
}
