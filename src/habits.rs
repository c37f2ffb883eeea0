// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Multi-period habit detection. These are on-demand pattern checks over
//! historical aggregates; nothing in here persists alerts.

use std::collections::BTreeMap;

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::allocation::linear_trend;
use crate::budgets::period_budgets;
use crate::period::all_periods;

/// A category must be over budget in at least this many of the inspected
/// periods to count as persistent.
const PERSISTENT_MIN_PERIODS: i64 = 2;
/// Normalized regression slope above which a category counts as trending
/// upward.
const TREND_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct Habit {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: String,
    pub message: String,
    pub action: String,
}

/// Inspect the last `periods_count` periods for repeated overruns and
/// rising per-category spending. Returns an empty list when there is not
/// enough history to compare.
pub fn analyze_spending_habits(conn: &Connection, periods_count: i64) -> Result<Vec<Habit>> {
    let mut periods = all_periods(conn, periods_count)?;
    if periods.len() < 2 {
        return Ok(Vec::new());
    }
    // Oldest first, so the trend reads forward in time.
    periods.reverse();

    let mut habits = Vec::new();

    // Repeated overruns: count, per category, the periods where spending
    // exceeded the allocation.
    let mut over_counts: BTreeMap<i64, (String, i64)> = BTreeMap::new();
    for period in &periods {
        for budget in period_budgets(conn, period.id)? {
            if budget.is_over {
                over_counts
                    .entry(budget.category_id)
                    .and_modify(|(_, n)| *n += 1)
                    .or_insert((budget.name.clone(), 1));
            }
        }
    }
    for (_, (name, count)) in &over_counts {
        if *count >= PERSISTENT_MIN_PERIODS {
            habits.push(Habit {
                kind: "persistent_over".into(),
                category: name.clone(),
                periods: Some(*count),
                trend: None,
                message: format!("Repeated overrun on {} ({} periods)", name, count),
            });
        }
    }

    // Per-category expense totals across the inspected periods.
    let mut totals_by_category: BTreeMap<i64, (String, Vec<i64>)> = BTreeMap::new();
    for period in &periods {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name,
                    COALESCE(SUM(CASE WHEN t.type='expense' THEN t.amount ELSE 0 END), 0)
             FROM transactions t
             JOIN budget_categories c ON t.category_id = c.id
             WHERE t.period_id=?1
             GROUP BY c.id",
        )?;
        let rows = stmt.query_map(params![period.id], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?))
        })?;
        for row in rows {
            let (id, name, total) = row?;
            totals_by_category
                .entry(id)
                .or_insert_with(|| (name, Vec::new()))
                .1
                .push(total);
        }
    }

    for (_, (name, totals)) in &totals_by_category {
        if totals.len() >= 3 {
            let trend = linear_trend(totals);
            if trend > TREND_THRESHOLD {
                let trend_pct = (trend * 100.0).round() as i64;
                habits.push(Habit {
                    kind: "increasing_trend".into(),
                    category: name.clone(),
                    periods: None,
                    trend: Some(trend_pct),
                    message: format!("Rising spending on {} (+{}%)", name, trend_pct),
                });
            }
        }
    }

    Ok(habits)
}

/// Map detected habits to prioritized recommendations, highest first.
pub fn recommendations(conn: &Connection) -> Result<Vec<Recommendation>> {
    let habits = analyze_spending_habits(conn, 3)?;
    let mut out = Vec::new();
    for habit in &habits {
        match habit.kind.as_str() {
            "persistent_over" => out.push(Recommendation {
                priority: "high".into(),
                message: format!(
                    "Cut spending on {} or raise its allocation",
                    habit.category
                ),
                action: format!("Review the budget for {}", habit.category),
            }),
            "increasing_trend" => out.push(Recommendation {
                priority: "medium".into(),
                message: format!("Spending on {} keeps going up", habit.category),
                action: "Look into what is driving the increase".into(),
            }),
            _ => {}
        }
    }
    let rank = |p: &str| match p {
        "high" => 3,
        "medium" => 2,
        _ => 1,
    };
    out.sort_by(|a, b| rank(&b.priority).cmp(&rank(&a.priority)));
    Ok(out)
}
