//! Publications and import bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

use grantdesk_core::{
    AppError, ImportRun, NewImportRun, NewPublication, Publication, PublicationSource,
};

use crate::{conflict_on_reference, inserted_id};

const PUBLICATION_COLUMNS: &str = "id, user_id, title, authors, venue, pub_year, doi, url, citation_count, source, external_id, content_hash, created_at, updated_at";
const IMPORT_RUN_COLUMNS: &str =
    "id, user_id, source, started_at, finished_at, created, updated, unchanged, failed, error";

/// Repository for publication records.
///
/// Implements [`grantdesk_core::PublicationStore`] so it can back an
/// [`grantdesk_core::ImportService`].
#[derive(Clone)]
pub struct PublicationRepository {
    pool: MySqlPool,
}

/// Aggregate numbers shown by the `stats` command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicationStats {
    pub total: i64,
    pub users_with_publications: i64,
    pub by_source: Vec<(String, i64)>,
    pub last_import: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct PublicationRow {
    id: i64,
    user_id: i64,
    title: String,
    authors: String,
    venue: Option<String>,
    pub_year: Option<i32>,
    doi: Option<String>,
    url: Option<String>,
    citation_count: i32,
    source: String,
    external_id: String,
    content_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PublicationRow> for Publication {
    fn from(row: PublicationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            authors: row.authors,
            venue: row.venue,
            pub_year: row.pub_year,
            doi: row.doi,
            url: row.url,
            citation_count: row.citation_count,
            source: row.source.parse().unwrap_or(PublicationSource::Manual),
            external_id: row.external_id,
            content_hash: row.content_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ImportRunRow {
    id: i64,
    user_id: i64,
    source: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    created: i32,
    updated: i32,
    unchanged: i32,
    failed: i32,
    error: Option<String>,
}

impl From<ImportRunRow> for ImportRun {
    fn from(row: ImportRunRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            source: row.source.parse().unwrap_or(PublicationSource::Manual),
            started_at: row.started_at,
            finished_at: row.finished_at,
            created: row.created,
            updated: row.updated,
            unchanged: row.unchanged,
            failed: row.failed,
            error: row.error,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HashRow {
    external_id: String,
    content_hash: String,
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total: Option<i64>,
    users: Option<i64>,
    last_import: Option<DateTime<Utc>>,
}

impl PublicationRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// A user's publications, newest first. `year` restricts to one
    /// publication year.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        year: Option<i32>,
    ) -> Result<Vec<Publication>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM publications
            WHERE user_id = ? AND (? IS NULL OR pub_year = ?)
            ORDER BY pub_year DESC, citation_count DESC, id
            "#,
            PUBLICATION_COLUMNS
        );
        let rows: Vec<PublicationRow> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(year)
            .bind(year)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Publication>, AppError> {
        let query = format!("SELECT {} FROM publications WHERE id = ?", PUBLICATION_COLUMNS);
        let row: Option<PublicationRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Map of external id to content hash for one user and source.
    pub async fn get_hashes(
        &self,
        user_id: i64,
        source: PublicationSource,
    ) -> Result<HashMap<String, String>, AppError> {
        let rows: Vec<HashRow> = sqlx::query_as(
            "SELECT external_id, content_hash FROM publications WHERE user_id = ? AND source = ?",
        )
        .bind(user_id)
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.external_id, row.content_hash))
            .collect())
    }

    /// Inserts or updates on `(user_id, source, external_id)`.
    pub async fn upsert(&self, publication: &NewPublication) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO publications (
                user_id, title, authors, venue, pub_year, doi, url,
                citation_count, source, external_id, content_hash
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                title = VALUES(title),
                authors = VALUES(authors),
                venue = VALUES(venue),
                pub_year = VALUES(pub_year),
                doi = VALUES(doi),
                url = VALUES(url),
                citation_count = VALUES(citation_count),
                content_hash = VALUES(content_hash)
            "#,
        )
        .bind(publication.user_id)
        .bind(&publication.title)
        .bind(&publication.authors)
        .bind(&publication.venue)
        .bind(publication.pub_year)
        .bind(&publication.doi)
        .bind(&publication.url)
        .bind(publication.citation_count)
        .bind(publication.source.as_str())
        .bind(&publication.external_id)
        .bind(&publication.content_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_reference(e, format!("user {} does not exist", publication.user_id)))?;
        Ok(())
    }

    /// Deletes a publication owned by `user_id`.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM publications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("publication {}", id)));
        }
        Ok(())
    }

    pub async fn record_import_run(&self, run: &NewImportRun) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO import_runs
                (user_id, source, started_at, finished_at, created, updated, unchanged, failed, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.user_id)
        .bind(run.source.as_str())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.created)
        .bind(run.updated)
        .bind(run.unchanged)
        .bind(run.failed)
        .bind(&run.error)
        .execute(&self.pool)
        .await?;
        Ok(inserted_id(&result))
    }

    /// Latest import runs, optionally for one user.
    pub async fn recent_runs(
        &self,
        user_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ImportRun>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM import_runs
            WHERE (? IS NULL OR user_id = ?)
            ORDER BY started_at DESC, id DESC
            LIMIT ?
            "#,
            IMPORT_RUN_COLUMNS
        );
        let rows: Vec<ImportRunRow> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_stats(&self) -> Result<PublicationStats, AppError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM publications) AS total,
                (SELECT COUNT(DISTINCT user_id) FROM publications) AS users,
                (SELECT MAX(finished_at) FROM import_runs) AS last_import
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_source: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) FROM publications GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PublicationStats {
            total: row.total.unwrap_or(0),
            users_with_publications: row.users.unwrap_or(0),
            by_source,
            last_import: row.last_import,
        })
    }
}

// =============================================================================
// Trait Implementation: PublicationStore
// =============================================================================

impl grantdesk_core::PublicationStore for PublicationRepository {
    async fn get_hashes(
        &self,
        user_id: i64,
        source: PublicationSource,
    ) -> Result<HashMap<String, String>, AppError> {
        PublicationRepository::get_hashes(self, user_id, source).await
    }

    async fn upsert(&self, publication: &NewPublication) -> Result<(), AppError> {
        PublicationRepository::upsert(self, publication).await
    }

    async fn record_import_run(&self, run: &NewImportRun) -> Result<i64, AppError> {
        PublicationRepository::record_import_run(self, run).await
    }
}
