//! Delta detection and statistics for publication imports.
//!
//! Pure logic, decoupled from fetching and persistence, so the import
//! service and the CLI share the same accounting.

use serde::Serialize;

/// Outcome of processing a single publication during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Content hash matches the stored row
    Unchanged,
    /// Stored row exists but its content changed
    Updated,
    /// First time this publication is seen for the user
    Created,
    /// Persisting the publication failed
    Failed,
}

/// Statistics for one user's import from one source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the matching counter.
    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Unchanged => self.unchanged += 1,
            ImportOutcome::Updated => self.updated += 1,
            ImportOutcome::Created => self.created += 1,
            ImportOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed
    }

    pub fn successful(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Result of delta detection for one publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportDecision {
    /// Whether the row must be written
    pub needs_write: bool,
    pub outcome: ImportOutcome,
    pub reason: &'static str,
}

/// Compares a stored content hash with a freshly computed one.
///
/// `existing_hash` is `None` when the publication has never been imported.
pub fn needs_update(existing_hash: Option<&str>, new_hash: &str) -> ImportDecision {
    match existing_hash {
        Some(hash) if hash == new_hash => ImportDecision {
            needs_write: false,
            outcome: ImportOutcome::Unchanged,
            reason: "content hash matches",
        },
        Some(_) => ImportDecision {
            needs_write: true,
            outcome: ImportOutcome::Updated,
            reason: "content hash changed",
        },
        None => ImportDecision {
            needs_write: true,
            outcome: ImportOutcome::Created,
            reason: "new publication",
        },
    }
}

/// Result for a single user in a batch import.
#[derive(Debug, Clone, Serialize)]
pub struct UserImportResult {
    pub user_id: i64,
    pub label: String,
    pub stats: ImportStats,
    pub error: Option<String>,
}

impl UserImportResult {
    pub fn success(user_id: i64, label: String, stats: ImportStats) -> Self {
        Self {
            user_id,
            label,
            stats,
            error: None,
        }
    }

    pub fn failure(user_id: i64, label: String, error: String) -> Self {
        Self {
            user_id,
            label,
            stats: ImportStats::default(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated results of importing several users.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchImportSummary {
    pub results: Vec<UserImportResult>,
}

impl BatchImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: UserImportResult) {
        self.results.push(result);
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Publications processed across all successful users.
    pub fn total_publications(&self) -> usize {
        self.results.iter().map(|r| r.stats.total()).sum()
    }

    pub fn total_users(&self) -> usize {
        self.results.len()
    }
}
