//! Fund categories, subcategories and their budget lines.

use sqlx::MySqlPool;
use sqlx::types::Json;

use grantdesk_core::{
    AppError, BudgetLine, BudgetScope, FundCategory, FundSubcategory, NewBudgetLine,
    NewFundCategory, NewFundSubcategory, RecordStatus, Role, SubcategoryUsage,
};

use crate::{conflict_on_reference, inserted_id};

/// Everything needed to build the fund tree of one year.
#[derive(Debug, Clone, Default)]
pub struct FundTreeRows {
    pub categories: Vec<FundCategory>,
    pub subcategories: Vec<FundSubcategory>,
    pub budget_lines: Vec<BudgetLine>,
}

#[derive(Clone)]
pub struct FundRepository {
    pool: MySqlPool,
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    year_id: i64,
    name: String,
    description: Option<String>,
    status: String,
    sort_order: i32,
}

impl From<CategoryRow> for FundCategory {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            year_id: row.year_id,
            name: row.name,
            description: row.description,
            status: row.status.parse().unwrap_or(RecordStatus::Inactive),
            sort_order: row.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubcategoryRow {
    id: i64,
    category_id: i64,
    name: String,
    fund_condition: Option<String>,
    target_roles: Json<Vec<String>>,
    status: String,
    sort_order: i32,
}

impl From<SubcategoryRow> for FundSubcategory {
    fn from(row: SubcategoryRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            fund_condition: row.fund_condition,
            target_roles: row
                .target_roles
                .0
                .iter()
                .filter_map(|r| r.parse::<Role>().ok())
                .collect(),
            status: row.status.parse().unwrap_or(RecordStatus::Inactive),
            sort_order: row.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BudgetLineRow {
    id: i64,
    subcategory_id: i64,
    level: Option<String>,
    scope: String,
    amount: i64,
    max_grants: Option<i32>,
    description: Option<String>,
}

impl From<BudgetLineRow> for BudgetLine {
    fn from(row: BudgetLineRow) -> Self {
        Self {
            id: row.id,
            subcategory_id: row.subcategory_id,
            level: row.level,
            scope: row.scope.parse().unwrap_or(BudgetScope::PerGrant),
            amount: row.amount,
            max_grants: row.max_grants,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    subcategory_id: i64,
    budget_level: Option<String>,
    approved_count: i64,
    approved_amount: i64,
}

fn role_names(roles: &[Role]) -> Json<Vec<&'static str>> {
    Json(roles.iter().map(|r| r.as_str()).collect())
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_budget_line(line: &NewBudgetLine) -> Result<(), AppError> {
    if line.amount < 0 {
        return Err(AppError::Validation("amount cannot be negative".to_string()));
    }
    if line.max_grants.is_some_and(|m| m < 0) {
        return Err(AppError::Validation(
            "max_grants cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Blank levels mean "no level".
fn normalize_level(level: Option<&str>) -> Option<&str> {
    level.map(str::trim).filter(|l| !l.is_empty())
}

const CATEGORY_COLUMNS: &str = "id, year_id, name, description, status, sort_order";
const SUBCATEGORY_COLUMNS: &str =
    "s.id, s.category_id, s.name, s.fund_condition, s.target_roles, s.status, s.sort_order";
const BUDGET_LINE_COLUMNS: &str =
    "b.id, b.subcategory_id, b.level, b.scope, b.amount, b.max_grants, b.description";

impl FundRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    pub async fn list_categories(&self, year_id: i64) -> Result<Vec<FundCategory>, AppError> {
        let query = format!(
            "SELECT {} FROM fund_categories WHERE year_id = ? ORDER BY sort_order, id",
            CATEGORY_COLUMNS
        );
        let rows: Vec<CategoryRow> = sqlx::query_as(&query)
            .bind(year_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<FundCategory>, AppError> {
        let query = format!("SELECT {} FROM fund_categories WHERE id = ?", CATEGORY_COLUMNS);
        let row: Option<CategoryRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn require_category(&self, id: i64) -> Result<FundCategory, AppError> {
        self.get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("fund category {}", id)))
    }

    pub async fn create_category(&self, category: &NewFundCategory) -> Result<FundCategory, AppError> {
        validate_name(&category.name)?;
        let result = sqlx::query(
            r#"
            INSERT INTO fund_categories (year_id, name, description, status, sort_order)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.year_id)
        .bind(category.name.trim())
        .bind(&category.description)
        .bind(category.status.as_str())
        .bind(category.sort_order)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_reference(e, format!("budget year {} does not exist", category.year_id)))?;

        self.require_category(inserted_id(&result)).await
    }

    pub async fn update_category(
        &self,
        id: i64,
        category: &NewFundCategory,
    ) -> Result<FundCategory, AppError> {
        validate_name(&category.name)?;
        self.require_category(id).await?;
        sqlx::query(
            r#"
            UPDATE fund_categories
            SET year_id = ?, name = ?, description = ?, status = ?, sort_order = ?
            WHERE id = ?
            "#,
        )
        .bind(category.year_id)
        .bind(category.name.trim())
        .bind(&category.description)
        .bind(category.status.as_str())
        .bind(category.sort_order)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_reference(e, format!("budget year {} does not exist", category.year_id)))?;

        self.require_category(id).await
    }

    /// Deletes a category with its subcategories and budget lines.
    ///
    /// Refused with `Conflict` once any request points into the category.
    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let (requests,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM fund_requests r
            JOIN fund_subcategories s ON s.id = r.subcategory_id
            WHERE s.category_id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if requests > 0 {
            return Err(AppError::Conflict(format!(
                "fund category {} has {} requests",
                id, requests
            )));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM fund_subcategories WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM fund_categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("fund category {}", id)));
        }
        tx.commit().await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    /// Subcategories of every category in a year.
    pub async fn list_subcategories(&self, year_id: i64) -> Result<Vec<FundSubcategory>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM fund_subcategories s
            JOIN fund_categories c ON c.id = s.category_id
            WHERE c.year_id = ?
            ORDER BY s.sort_order, s.id
            "#,
            SUBCATEGORY_COLUMNS
        );
        let rows: Vec<SubcategoryRow> = sqlx::query_as(&query)
            .bind(year_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_subcategory(&self, id: i64) -> Result<Option<FundSubcategory>, AppError> {
        let query = format!("SELECT {} FROM fund_subcategories s WHERE s.id = ?", SUBCATEGORY_COLUMNS);
        let row: Option<SubcategoryRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn require_subcategory(&self, id: i64) -> Result<FundSubcategory, AppError> {
        self.get_subcategory(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("fund subcategory {}", id)))
    }

    /// Budget year a subcategory belongs to.
    pub async fn year_of_subcategory(&self, id: i64) -> Result<Option<i64>, AppError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT c.year_id FROM fund_subcategories s
            JOIN fund_categories c ON c.id = s.category_id
            WHERE s.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(year_id,)| year_id))
    }

    pub async fn create_subcategory(
        &self,
        subcategory: &NewFundSubcategory,
    ) -> Result<FundSubcategory, AppError> {
        validate_name(&subcategory.name)?;
        let result = sqlx::query(
            r#"
            INSERT INTO fund_subcategories
                (category_id, name, fund_condition, target_roles, status, sort_order)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(subcategory.category_id)
        .bind(subcategory.name.trim())
        .bind(&subcategory.fund_condition)
        .bind(role_names(&subcategory.target_roles))
        .bind(subcategory.status.as_str())
        .bind(subcategory.sort_order)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_reference(
                e,
                format!("fund category {} does not exist", subcategory.category_id),
            )
        })?;

        self.require_subcategory(inserted_id(&result)).await
    }

    pub async fn update_subcategory(
        &self,
        id: i64,
        subcategory: &NewFundSubcategory,
    ) -> Result<FundSubcategory, AppError> {
        validate_name(&subcategory.name)?;
        self.require_subcategory(id).await?;
        sqlx::query(
            r#"
            UPDATE fund_subcategories
            SET category_id = ?, name = ?, fund_condition = ?, target_roles = ?,
                status = ?, sort_order = ?
            WHERE id = ?
            "#,
        )
        .bind(subcategory.category_id)
        .bind(subcategory.name.trim())
        .bind(&subcategory.fund_condition)
        .bind(role_names(&subcategory.target_roles))
        .bind(subcategory.status.as_str())
        .bind(subcategory.sort_order)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_reference(
                e,
                format!("fund category {} does not exist", subcategory.category_id),
            )
        })?;

        self.require_subcategory(id).await
    }

    /// Deletes a subcategory and its budget lines unless requests point to it.
    pub async fn delete_subcategory(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM fund_subcategories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_reference(e, format!("fund subcategory {} has requests", id)))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("fund subcategory {}", id)));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Budget lines
    // -------------------------------------------------------------------------

    pub async fn list_budget_lines(&self, year_id: i64) -> Result<Vec<BudgetLine>, AppError> {
        let query = format!(
            r#"
            SELECT {} FROM subcategory_budgets b
            JOIN fund_subcategories s ON s.id = b.subcategory_id
            JOIN fund_categories c ON c.id = s.category_id
            WHERE c.year_id = ?
            ORDER BY b.subcategory_id, b.id
            "#,
            BUDGET_LINE_COLUMNS
        );
        let rows: Vec<BudgetLineRow> = sqlx::query_as(&query)
            .bind(year_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_budget_line(&self, id: i64) -> Result<Option<BudgetLine>, AppError> {
        let query = format!("SELECT {} FROM subcategory_budgets b WHERE b.id = ?", BUDGET_LINE_COLUMNS);
        let row: Option<BudgetLineRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn require_budget_line(&self, id: i64) -> Result<BudgetLine, AppError> {
        self.get_budget_line(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("budget line {}", id)))
    }

    pub async fn create_budget_line(&self, line: &NewBudgetLine) -> Result<BudgetLine, AppError> {
        validate_budget_line(line)?;
        let result = sqlx::query(
            r#"
            INSERT INTO subcategory_budgets
                (subcategory_id, level, scope, amount, max_grants, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(line.subcategory_id)
        .bind(normalize_level(line.level.as_deref()))
        .bind(line.scope.as_str())
        .bind(line.amount)
        .bind(line.max_grants)
        .bind(&line.description)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_reference(
                e,
                format!("fund subcategory {} does not exist", line.subcategory_id),
            )
        })?;

        self.require_budget_line(inserted_id(&result)).await
    }

    pub async fn update_budget_line(&self, id: i64, line: &NewBudgetLine) -> Result<BudgetLine, AppError> {
        validate_budget_line(line)?;
        self.require_budget_line(id).await?;
        sqlx::query(
            r#"
            UPDATE subcategory_budgets
            SET subcategory_id = ?, level = ?, scope = ?, amount = ?, max_grants = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(line.subcategory_id)
        .bind(normalize_level(line.level.as_deref()))
        .bind(line.scope.as_str())
        .bind(line.amount)
        .bind(line.max_grants)
        .bind(&line.description)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_reference(
                e,
                format!("fund subcategory {} does not exist", line.subcategory_id),
            )
        })?;

        self.require_budget_line(id).await
    }

    pub async fn delete_budget_line(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subcategory_budgets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("budget line {}", id)));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Aggregation inputs
    // -------------------------------------------------------------------------

    /// Loads categories, subcategories and budget lines of a year.
    pub async fn load_tree_rows(&self, year_id: i64) -> Result<FundTreeRows, AppError> {
        Ok(FundTreeRows {
            categories: self.list_categories(year_id).await?,
            subcategories: self.list_subcategories(year_id).await?,
            budget_lines: self.list_budget_lines(year_id).await?,
        })
    }

    /// Approved request count and amount per subcategory and budget level of a year.
    pub async fn usage_by_subcategory(&self, year_id: i64) -> Result<Vec<SubcategoryUsage>, AppError> {
        let rows: Vec<UsageRow> = sqlx::query_as(
            r#"
            SELECT
                subcategory_id,
                budget_level,
                COUNT(*) AS approved_count,
                CAST(COALESCE(SUM(COALESCE(approved_amount, requested_amount)), 0) AS SIGNED)
                    AS approved_amount
            FROM fund_requests
            WHERE year_id = ? AND status = 'approved'
            GROUP BY subcategory_id, budget_level
            ORDER BY subcategory_id, budget_level
            "#,
        )
        .bind(year_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SubcategoryUsage {
                subcategory_id: row.subcategory_id,
                budget_level: row.budget_level,
                approved_count: row.approved_count,
                approved_amount: row.approved_amount,
            })
            .collect())
    }
}
