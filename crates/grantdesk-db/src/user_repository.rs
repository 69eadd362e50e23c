//! User accounts and departments.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use grantdesk_core::{AppError, Department, NewUser, PublicationSource, Role, User, UserUpdate};

use crate::{conflict_on_duplicate, inserted_id};

/// Column list for user SELECTs. Kept as a literal so `format!` never sees input.
const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, department_id, scopus_author_id, scholar_author_id, active, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: MySqlPool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    department_id: Option<i64>,
    scopus_author_id: Option<String>,
    scholar_author_id: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            // Unknown roles degrade to the least privileged one.
            role: row.role.parse().unwrap_or(Role::Teacher),
            department_id: row.department_id,
            scopus_author_id: row.scopus_author_id,
            scholar_author_id: row.scholar_author_id,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Empty strings clear an author id.
fn normalize_author_id(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl UserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Inserts a user. Emails are stored lowercased and must be unique.
    pub async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let email = user.email.trim().to_lowercase();
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, full_name, role, department_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.full_name.trim())
        .bind(user.role.as_str())
        .bind(user.department_id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, format!("email '{}' is already registered", email)))?;

        self.require(inserted_id(&result)).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Like [`get`](Self::get) but a missing user is `NotFound`.
    pub async fn require(&self, id: i64) -> Result<User, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        let query = format!("SELECT {} FROM users ORDER BY full_name, id", USER_COLUMNS);
        let rows: Vec<UserRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active members of a department.
    pub async fn list_by_department(&self, department_id: i64) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE department_id = ? AND active = TRUE ORDER BY full_name",
            USER_COLUMNS
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Applies a partial profile update and returns the new row.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<User, AppError> {
        sqlx::query(
            r#"
            UPDATE users SET
                full_name = COALESCE(?, full_name),
                role = COALESCE(?, role),
                department_id = COALESCE(?, department_id)
            WHERE id = ?
            "#,
        )
        .bind(update.full_name.as_deref().map(str::trim))
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.department_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if update.scopus_author_id.is_some() || update.scholar_author_id.is_some() {
            let current = self.require(id).await?;
            self.set_author_ids(
                id,
                update
                    .scopus_author_id
                    .as_deref()
                    .or(current.scopus_author_id.as_deref()),
                update
                    .scholar_author_id
                    .as_deref()
                    .or(current.scholar_author_id.as_deref()),
            )
            .await?;
        }

        self.require(id).await
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), AppError> {
        self.require(id).await?;
        sqlx::query("UPDATE users SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        self.require(id).await?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replaces both author ids. Blank values clear the column.
    pub async fn set_author_ids(
        &self,
        id: i64,
        scopus_author_id: Option<&str>,
        scholar_author_id: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET scopus_author_id = ?, scholar_author_id = ? WHERE id = ?")
            .bind(normalize_author_id(scopus_author_id))
            .bind(normalize_author_id(scholar_author_id))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Active users that have an author id for `source`.
    pub async fn list_with_author_ids(
        &self,
        source: PublicationSource,
    ) -> Result<Vec<User>, AppError> {
        let column = match source {
            PublicationSource::Scopus => "scopus_author_id",
            PublicationSource::Scholar => "scholar_author_id",
            PublicationSource::Manual => return Ok(Vec::new()),
        };
        let query = format!(
            "SELECT {} FROM users WHERE active = TRUE AND {} IS NOT NULL AND {} <> '' ORDER BY id",
            USER_COLUMNS, column, column
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_by_role(&self) -> Result<Vec<(String, i64)>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT role, COUNT(*) FROM users WHERE active = TRUE GROUP BY role ORDER BY role",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Departments
    // -------------------------------------------------------------------------

    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let rows = sqlx::query_as("SELECT id, name FROM departments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_department(&self, id: i64) -> Result<Option<Department>, AppError> {
        let row = sqlx::query_as("SELECT id, name FROM departments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create_department(&self, name: &str) -> Result<Department, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "department name cannot be empty".to_string(),
            ));
        }
        let result = sqlx::query("INSERT INTO departments (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, format!("department '{}' already exists", name)))?;

        Ok(Department {
            id: inserted_id(&result),
            name: name.to_string(),
        })
    }
}
