//! Request statistics for dashboards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::RequestStatus;

/// Minimal projection of a fund request used for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DashboardRow {
    pub category_id: i64,
    pub category_name: String,
    pub status: String,
    pub requested_amount: i64,
    pub approved_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub name: String,
    pub requests: usize,
    pub requested: i64,
    pub approved: i64,
}

/// Aggregated view over a set of requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub total_requests: usize,
    /// One entry per status, in lifecycle order, including zero counts.
    pub by_status: Vec<StatusCount>,
    /// Sum of requested amounts, drafts and withdrawn requests excluded.
    pub requested_total: i64,
    /// Sum of approved amounts of approved requests.
    pub approved_total: i64,
    /// Requests awaiting a reviewer.
    pub pending_review: usize,
    pub by_category: Vec<CategoryTotal>,
}

/// Aggregates dashboard rows.
///
/// Rows with an unknown status are counted in `total_requests` only.
pub fn summarize_requests(rows: &[DashboardRow]) -> RequestSummary {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut categories: BTreeMap<i64, CategoryTotal> = BTreeMap::new();
    let mut summary = RequestSummary {
        total_requests: rows.len(),
        ..Default::default()
    };

    for row in rows {
        let Ok(status) = row.status.parse::<RequestStatus>() else {
            continue;
        };
        if let Some(pos) = RequestStatus::ALL.iter().position(|s| *s == status) {
            *counts.entry(pos).or_default() += 1;
        }

        let category = categories
            .entry(row.category_id)
            .or_insert_with(|| CategoryTotal {
                category_id: row.category_id,
                name: row.category_name.clone(),
                requests: 0,
                requested: 0,
                approved: 0,
            });
        category.requests += 1;

        if !matches!(status, RequestStatus::Draft | RequestStatus::Withdrawn) {
            summary.requested_total += row.requested_amount;
            category.requested += row.requested_amount;
        }
        if status == RequestStatus::Approved {
            let approved = row.approved_amount.unwrap_or(row.requested_amount);
            summary.approved_total += approved;
            category.approved += approved;
        }
        if status.awaiting_stage().is_some() {
            summary.pending_review += 1;
        }
    }

    summary.by_status = RequestStatus::ALL
        .iter()
        .enumerate()
        .map(|(pos, status)| StatusCount {
            status: *status,
            count: counts.get(&pos).copied().unwrap_or(0),
        })
        .collect();
    summary.by_category = categories.into_values().collect();
    summary
}
