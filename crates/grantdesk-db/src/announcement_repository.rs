//! Portal announcements.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use grantdesk_core::{
    Announcement, AnnouncementKind, AnnouncementStatus, AppError, NewAnnouncement,
};

use crate::{conflict_on_reference, inserted_id};

const ANNOUNCEMENT_COLUMNS: &str = "id, title, content, kind, status, published_at, expires_at, attachment_url, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct AnnouncementRepository {
    pool: MySqlPool,
}

#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    id: i64,
    title: String,
    content: String,
    kind: String,
    status: String,
    published_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    attachment_url: Option<String>,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            kind: row.kind.parse().unwrap_or(AnnouncementKind::General),
            status: row.status.parse().unwrap_or(AnnouncementStatus::Draft),
            published_at: row.published_at,
            expires_at: row.expires_at,
            attachment_url: row.attachment_url,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Publishing without a date publishes immediately.
fn effective_published_at(
    announcement: &NewAnnouncement,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match announcement.status {
        AnnouncementStatus::Published => announcement.published_at.or(Some(now)),
        AnnouncementStatus::Draft => announcement.published_at,
    }
}

impl AnnouncementRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Announcements visible at `now`, most recent first.
    pub async fn list_visible(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM announcements
            WHERE status = 'published'
              AND (published_at IS NULL OR published_at <= ?)
              AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY published_at DESC, id DESC
            "#,
            ANNOUNCEMENT_COLUMNS
        );
        let rows: Vec<AnnouncementRow> = sqlx::query_as(&query)
            .bind(now)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every announcement including drafts and expired ones.
    pub async fn list_all(&self) -> Result<Vec<Announcement>, AppError> {
        let query = format!(
            "SELECT {} FROM announcements ORDER BY created_at DESC, id DESC",
            ANNOUNCEMENT_COLUMNS
        );
        let rows: Vec<AnnouncementRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Announcement>, AppError> {
        let query = format!("SELECT {} FROM announcements WHERE id = ?", ANNOUNCEMENT_COLUMNS);
        let row: Option<AnnouncementRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn require(&self, id: i64) -> Result<Announcement, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("announcement {}", id)))
    }

    pub async fn create(
        &self,
        announcement: &NewAnnouncement,
        created_by: i64,
    ) -> Result<Announcement, AppError> {
        announcement.validate()?;
        let result = sqlx::query(
            r#"
            INSERT INTO announcements
                (title, content, kind, status, published_at, expires_at, attachment_url, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(announcement.title.trim())
        .bind(&announcement.content)
        .bind(announcement.kind.as_str())
        .bind(announcement.status.as_str())
        .bind(effective_published_at(announcement, Utc::now()))
        .bind(announcement.expires_at)
        .bind(&announcement.attachment_url)
        .bind(created_by)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_reference(e, format!("user {} does not exist", created_by)))?;

        self.require(inserted_id(&result)).await
    }

    pub async fn update(
        &self,
        id: i64,
        announcement: &NewAnnouncement,
    ) -> Result<Announcement, AppError> {
        announcement.validate()?;
        let current = self.require(id).await?;
        // Re-publishing keeps the original publication date.
        let published_at = effective_published_at(announcement, Utc::now());
        let published_at = match (announcement.published_at, current.published_at) {
            (None, Some(existing)) if announcement.status == AnnouncementStatus::Published => {
                Some(existing)
            }
            _ => published_at,
        };

        sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, kind = ?, status = ?, published_at = ?,
                expires_at = ?, attachment_url = ?
            WHERE id = ?
            "#,
        )
        .bind(announcement.title.trim())
        .bind(&announcement.content)
        .bind(announcement.kind.as_str())
        .bind(announcement.status.as_str())
        .bind(published_at)
        .bind(announcement.expires_at)
        .bind(&announcement.attachment_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.require(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("announcement {}", id)));
        }
        Ok(())
    }
}
