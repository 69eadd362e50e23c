//! Fund tree aggregation.
//!
//! Categories, subcategories and budget lines come out of the database as flat
//! rows. This module folds them into the nested structure the API and the
//! dashboards render, and computes what is left of each allocation.
//!
//! Budget lines with [`BudgetScope::Overall`] add up to the subcategory's
//! allocation; lines with [`BudgetScope::PerGrant`] are grouped by `level`
//! and give the ceiling for a single grant at that level.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppError;
use crate::models::{
    BudgetLine, BudgetScope, FundCategory, FundSubcategory, RecordStatus, Role, SubcategoryUsage,
};

/// A category with its subcategories.
#[derive(Debug, Clone, Serialize)]
pub struct FundCategoryView {
    pub id: i64,
    pub year_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
    pub sort_order: i32,
    pub subcategories: Vec<FundSubcategoryView>,
}

/// A subcategory with aggregated budget figures.
#[derive(Debug, Clone, Serialize)]
pub struct FundSubcategoryView {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub fund_condition: Option<String>,
    pub target_roles: Vec<Role>,
    pub status: RecordStatus,
    pub sort_order: i32,
    /// Sum of overall lines; `None` means no cap.
    pub allocated: Option<i64>,
    /// Number of grants the overall lines allow; `None` means no cap.
    pub max_grants: Option<i64>,
    pub levels: Vec<FundLevelView>,
    pub used_amount: i64,
    pub used_grants: i64,
    pub remaining_amount: Option<i64>,
    pub remaining_grants: Option<i64>,
}

/// Per-grant ceiling for one level (e.g. "Q1", "international").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundLevelView {
    pub level: Option<String>,
    pub max_amount_per_grant: i64,
    pub max_grants: Option<i64>,
    pub description: Option<String>,
    pub used_grants: i64,
    pub remaining_grants: Option<i64>,
}

/// Sums optional caps: any unlimited entry (or no entry at all) makes the total unlimited.
fn sum_caps<I: IntoIterator<Item = Option<i32>>>(caps: I) -> Option<i64> {
    let mut total = 0i64;
    let mut seen = false;
    for cap in caps {
        total += i64::from(cap?);
        seen = true;
    }
    seen.then_some(total)
}

fn group_levels(lines: &[&BudgetLine], usage: &[&SubcategoryUsage]) -> Vec<FundLevelView> {
    let mut levels: Vec<FundLevelView> = Vec::new();
    let mut caps: Vec<Vec<Option<i32>>> = Vec::new();

    for line in lines.iter().filter(|l| l.scope == BudgetScope::PerGrant) {
        match levels.iter().position(|v| v.level == line.level) {
            Some(idx) => {
                let view = &mut levels[idx];
                view.max_amount_per_grant = view.max_amount_per_grant.max(line.amount);
                if view.description.is_none() {
                    view.description = line.description.clone();
                }
                caps[idx].push(line.max_grants);
            }
            None => {
                levels.push(FundLevelView {
                    level: line.level.clone(),
                    max_amount_per_grant: line.amount,
                    max_grants: None,
                    description: line.description.clone(),
                    used_grants: 0,
                    remaining_grants: None,
                });
                caps.push(vec![line.max_grants]);
            }
        }
    }

    for (view, level_caps) in levels.iter_mut().zip(caps) {
        view.max_grants = sum_caps(level_caps);
        view.used_grants = usage
            .iter()
            .filter(|u| u.budget_level == view.level)
            .map(|u| u.approved_count)
            .sum();
        view.remaining_grants = view.max_grants.map(|g| (g - view.used_grants).max(0));
    }
    levels
}

fn build_subcategory(
    sub: FundSubcategory,
    lines: &[&BudgetLine],
    usage: &[&SubcategoryUsage],
) -> FundSubcategoryView {
    let overall: Vec<&&BudgetLine> = lines
        .iter()
        .filter(|l| l.scope == BudgetScope::Overall)
        .collect();

    let allocated = (!overall.is_empty()).then(|| overall.iter().map(|l| l.amount).sum::<i64>());
    let max_grants = sum_caps(overall.iter().map(|l| l.max_grants));

    let used_amount: i64 = usage.iter().map(|u| u.approved_amount).sum();
    let used_grants: i64 = usage.iter().map(|u| u.approved_count).sum();

    let remaining_amount = allocated.map(|a| (a - used_amount).max(0));
    let remaining_grants = max_grants.map(|g| (g - used_grants).max(0));

    FundSubcategoryView {
        id: sub.id,
        category_id: sub.category_id,
        name: sub.name,
        fund_condition: sub.fund_condition,
        target_roles: sub.target_roles,
        status: sub.status,
        sort_order: sub.sort_order,
        allocated,
        max_grants,
        levels: group_levels(lines, usage),
        used_amount,
        used_grants,
        remaining_amount,
        remaining_grants,
    }
}

/// Builds the nested fund tree for one year.
///
/// Categories and subcategories are ordered by `(sort_order, id)`.
/// Subcategories whose category is not in `categories` are dropped, as are
/// budget lines whose subcategory is unknown.
pub fn build_fund_tree(
    mut categories: Vec<FundCategory>,
    mut subcategories: Vec<FundSubcategory>,
    budgets: &[BudgetLine],
    usage: &[SubcategoryUsage],
) -> Vec<FundCategoryView> {
    categories.sort_by_key(|c| (c.sort_order, c.id));
    subcategories.sort_by_key(|s| (s.sort_order, s.id));

    let mut lines_by_sub: HashMap<i64, Vec<&BudgetLine>> = HashMap::new();
    for line in budgets {
        lines_by_sub.entry(line.subcategory_id).or_default().push(line);
    }
    let mut usage_by_sub: HashMap<i64, Vec<&SubcategoryUsage>> = HashMap::new();
    for row in usage {
        usage_by_sub.entry(row.subcategory_id).or_default().push(row);
    }

    let mut subs_by_cat: HashMap<i64, Vec<FundSubcategoryView>> = HashMap::new();
    for sub in subcategories {
        let lines = lines_by_sub.get(&sub.id).map(Vec::as_slice).unwrap_or(&[]);
        let used = usage_by_sub.get(&sub.id).map(Vec::as_slice).unwrap_or(&[]);
        let category_id = sub.category_id;
        subs_by_cat
            .entry(category_id)
            .or_default()
            .push(build_subcategory(sub, lines, used));
    }

    categories
        .into_iter()
        .map(|cat| FundCategoryView {
            subcategories: subs_by_cat.remove(&cat.id).unwrap_or_default(),
            id: cat.id,
            year_id: cat.year_id,
            name: cat.name,
            description: cat.description,
            status: cat.status,
            sort_order: cat.sort_order,
        })
        .collect()
}

/// Restricts a tree to what `role` may apply for.
///
/// Admin roles see the full tree. Everyone else sees active categories and
/// active subcategories that target their role; empty categories are removed.
pub fn filter_for_role(tree: Vec<FundCategoryView>, role: Role) -> Vec<FundCategoryView> {
    if role.can_access_admin() {
        return tree;
    }

    tree.into_iter()
        .filter(|cat| cat.status == RecordStatus::Active)
        .filter_map(|mut cat| {
            cat.subcategories.retain(|sub| {
                sub.status == RecordStatus::Active && sub.target_roles.contains(&role)
            });
            (!cat.subcategories.is_empty()).then_some(cat)
        })
        .collect()
}

/// Looks up a subcategory anywhere in the tree.
pub fn find_subcategory(tree: &[FundCategoryView], id: i64) -> Option<&FundSubcategoryView> {
    tree.iter()
        .flat_map(|cat| cat.subcategories.iter())
        .find(|sub| sub.id == id)
}

/// Checks that `amount` fits the subcategory at `level`.
///
/// When the subcategory defines per-grant levels, the request must name one
/// of them (a single unnamed level is picked implicitly).
pub fn check_allocation(
    sub: &FundSubcategoryView,
    level: Option<&str>,
    amount: i64,
) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }

    if !sub.levels.is_empty() {
        let chosen = match level {
            Some(name) => sub
                .levels
                .iter()
                .find(|l| l.level.as_deref() == Some(name))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "unknown budget level '{}' for '{}'",
                        name, sub.name
                    ))
                })?,
            None => match sub.levels.as_slice() {
                [only] if only.level.is_none() => only,
                _ => {
                    return Err(AppError::Validation(format!(
                        "a budget level is required for '{}'",
                        sub.name
                    )));
                }
            },
        };

        if amount > chosen.max_amount_per_grant {
            return Err(AppError::BudgetExceeded(format!(
                "{} exceeds the per-grant ceiling of {}",
                amount, chosen.max_amount_per_grant
            )));
        }

        if chosen.remaining_grants == Some(0) {
            return Err(AppError::BudgetExceeded(format!(
                "no grants remaining at level '{}' in '{}'",
                chosen.level.as_deref().unwrap_or("default"),
                sub.name
            )));
        }
    }

    if sub.remaining_grants == Some(0) {
        return Err(AppError::BudgetExceeded(format!(
            "no grants remaining in '{}'",
            sub.name
        )));
    }

    if let Some(remaining) = sub.remaining_amount {
        if amount > remaining {
            return Err(AppError::BudgetExceeded(format!(
                "{} exceeds the remaining budget of {}",
                amount, remaining
            )));
        }
    }

    Ok(())
}
