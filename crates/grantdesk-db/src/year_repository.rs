//! Budget years.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use grantdesk_core::{AppError, BudgetYear, NewBudgetYear, RecordStatus};

use crate::{conflict_on_duplicate, conflict_on_reference, inserted_id};

const YEAR_COLUMNS: &str = "id, year, budget, is_current, status, created_at, updated_at";

#[derive(Clone)]
pub struct YearRepository {
    pool: MySqlPool,
}

#[derive(sqlx::FromRow)]
struct YearRow {
    id: i64,
    year: i32,
    budget: i64,
    is_current: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<YearRow> for BudgetYear {
    fn from(row: YearRow) -> Self {
        Self {
            id: row.id,
            year: row.year,
            budget: row.budget,
            is_current: row.is_current,
            status: row.status.parse().unwrap_or(RecordStatus::Inactive),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn validate(year: &NewBudgetYear) -> Result<(), AppError> {
    if !(1900..=9999).contains(&year.year) {
        return Err(AppError::Validation(format!("invalid year {}", year.year)));
    }
    if year.budget < 0 {
        return Err(AppError::Validation(
            "budget cannot be negative".to_string(),
        ));
    }
    Ok(())
}

impl YearRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// All years, newest first.
    pub async fn list(&self) -> Result<Vec<BudgetYear>, AppError> {
        let query = format!("SELECT {} FROM budget_years ORDER BY year DESC", YEAR_COLUMNS);
        let rows: Vec<YearRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<BudgetYear>, AppError> {
        let query = format!("SELECT {} FROM budget_years WHERE id = ?", YEAR_COLUMNS);
        let row: Option<YearRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn require(&self, id: i64) -> Result<BudgetYear, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("budget year {}", id)))
    }

    pub async fn find_by_year(&self, year: i32) -> Result<Option<BudgetYear>, AppError> {
        let query = format!("SELECT {} FROM budget_years WHERE year = ?", YEAR_COLUMNS);
        let row: Option<YearRow> = sqlx::query_as(&query)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// The year flagged as current, if any.
    pub async fn current(&self) -> Result<Option<BudgetYear>, AppError> {
        let query = format!(
            "SELECT {} FROM budget_years WHERE is_current = TRUE LIMIT 1",
            YEAR_COLUMNS
        );
        let row: Option<YearRow> = sqlx::query_as(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(&self, year: &NewBudgetYear) -> Result<BudgetYear, AppError> {
        validate(year)?;
        let result =
            sqlx::query("INSERT INTO budget_years (year, budget, status) VALUES (?, ?, ?)")
                .bind(year.year)
                .bind(year.budget)
                .bind(year.status.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| conflict_on_duplicate(e, format!("year {} already exists", year.year)))?;

        self.require(inserted_id(&result)).await
    }

    pub async fn update(&self, id: i64, year: &NewBudgetYear) -> Result<BudgetYear, AppError> {
        validate(year)?;
        self.require(id).await?;
        sqlx::query("UPDATE budget_years SET year = ?, budget = ?, status = ? WHERE id = ?")
            .bind(year.year)
            .bind(year.budget)
            .bind(year.status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, format!("year {} already exists", year.year)))?;

        self.require(id).await
    }

    /// Makes `id` the only current year.
    pub async fn set_current(&self, id: i64) -> Result<BudgetYear, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM budget_years WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("budget year {}", id)));
        }

        sqlx::query("UPDATE budget_years SET is_current = FALSE WHERE is_current = TRUE AND id <> ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE budget_years SET is_current = TRUE WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(year_id = id, "Current budget year changed");

        self.require(id).await
    }

    /// Deletes a year that nothing refers to.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let (categories, requests): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM fund_categories WHERE year_id = ?),
                (SELECT COUNT(*) FROM fund_requests WHERE year_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if categories > 0 || requests > 0 {
            return Err(AppError::Conflict(format!(
                "budget year {} is referenced by {} categories and {} requests",
                id, categories, requests
            )));
        }

        let result = sqlx::query("DELETE FROM budget_years WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_reference(e, format!("budget year {} is in use", id)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("budget year {}", id)));
        }
        Ok(())
    }
}
