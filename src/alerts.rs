// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Threshold alerts and per-expense habit signals.
//!
//! Threshold checks run after every expense write and insert a fresh row
//! whenever the condition holds. There is intentionally no de-duplication
//! against earlier identical alerts; readers see repeats until they
//! acknowledge them.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::allocation::{budget_usage, BLOCK_THRESHOLD, CRITICAL_THRESHOLD, WARNING_THRESHOLD};
use crate::budgets::category_budget;
use crate::models::Alert;
use crate::utils::{category_by_id, setting_i64};

// Habit heuristics are tunable through the settings table instead of
// hardcoding category ids.
pub const SETTING_HOUSEHOLD_CATEGORY: &str = "habit_household_category";
pub const SETTING_COMMUNICATION_CATEGORY: &str = "habit_communication_category";
pub const SETTING_USAGE_GAP_POINTS: &str = "habit_usage_gap_points";
pub const SETTING_EARLY_DAYS: &str = "habit_early_days";
pub const SETTING_LARGE_EXPENSE: &str = "habit_large_expense_threshold";

const DEFAULT_USAGE_GAP_POINTS: i64 = 10;
const DEFAULT_EARLY_DAYS: i64 = 3;
const DEFAULT_LARGE_EXPENSE: i64 = 10000;

pub fn create_alert(
    conn: &Connection,
    period_id: i64,
    kind: &str,
    level: &str,
    message: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO alerts(period_id, type, level, message) VALUES (?1, ?2, ?3, ?4)",
        params![period_id, kind, level, message],
    )?;
    Ok(())
}

/// Compare a category's usage against the three fixed thresholds and emit
/// at most one alert per check.
pub fn check_budget_alerts(conn: &Connection, period_id: i64, category_id: i64) -> Result<()> {
    let (Some(budget), Some(category)) = (
        category_budget(conn, period_id, category_id)?,
        category_by_id(conn, category_id)?,
    ) else {
        return Ok(());
    };

    let percentage = budget_usage(budget.allocated_amount, budget.spent_amount);

    if percentage >= WARNING_THRESHOLD && percentage < CRITICAL_THRESHOLD {
        create_alert(
            conn,
            period_id,
            "threshold",
            "warning",
            &format!("{} at {}% - watch this budget", category.name, percentage),
        )?;
    }
    if percentage >= CRITICAL_THRESHOLD && percentage < BLOCK_THRESHOLD {
        create_alert(
            conn,
            period_id,
            "threshold",
            "danger",
            &format!("{} at {}% - critical", category.name, percentage),
        )?;
    }
    if percentage >= BLOCK_THRESHOLD {
        create_alert(
            conn,
            period_id,
            "threshold",
            "danger",
            &format!("{} at {}% - BUDGET EXHAUSTED", category.name, percentage),
        )?;
    }
    Ok(())
}

/// One-off habit signals evaluated against the expense that was just
/// written. All category references and thresholds come from settings.
pub fn check_habit_signals(
    conn: &Connection,
    period_id: i64,
    category_id: i64,
    amount: i64,
    today: NaiveDate,
) -> Result<()> {
    household_vs_communication(conn, period_id)?;
    early_contingency_usage(conn, period_id, category_id, today)?;
    early_large_expense(conn, period_id, category_id, amount, today)?;
    Ok(())
}

/// The household budget running more than N points ahead of the
/// communication budget. Skipped unless both references are configured.
fn household_vs_communication(conn: &Connection, period_id: i64) -> Result<()> {
    let household_id = setting_i64(conn, SETTING_HOUSEHOLD_CATEGORY, 0)?;
    let communication_id = setting_i64(conn, SETTING_COMMUNICATION_CATEGORY, 0)?;
    if household_id <= 0 || communication_id <= 0 {
        return Ok(());
    }
    let gap = setting_i64(conn, SETTING_USAGE_GAP_POINTS, DEFAULT_USAGE_GAP_POINTS)?;

    let (Some(household), Some(communication)) = (
        category_budget(conn, period_id, household_id)?,
        category_budget(conn, period_id, communication_id)?,
    ) else {
        return Ok(());
    };

    let household_pct = budget_usage(household.allocated_amount, household.spent_amount);
    let communication_pct =
        budget_usage(communication.allocated_amount, communication.spent_amount);
    if household_pct > communication_pct + gap as f64 {
        create_alert(
            conn,
            period_id,
            "habit",
            "warning",
            &format!(
                "{} ({}%) > {} ({}%) - check your priorities",
                household.name, household_pct, communication.name, communication_pct
            ),
        )?;
    }
    Ok(())
}

/// The contingency bucket more than half used while less than half of the
/// period has elapsed.
fn early_contingency_usage(
    conn: &Connection,
    period_id: i64,
    category_id: i64,
    today: NaiveDate,
) -> Result<()> {
    let Some(category) = category_by_id(conn, category_id)? else {
        return Ok(());
    };
    if !category.is_unexpected {
        return Ok(());
    }
    let Some(budget) = category_budget(conn, period_id, category_id)? else {
        return Ok(());
    };
    let Some(period) = crate::period::period_by_id(conn, period_id)? else {
        return Ok(());
    };

    let total_days = (period.end_date - period.start_date).num_days();
    if total_days <= 0 {
        return Ok(());
    }
    let days_passed = (today - period.start_date).num_days().max(0);
    let percent_time = days_passed as f64 / total_days as f64 * 100.0;
    let percent_used = budget_usage(budget.allocated_amount, budget.spent_amount);

    if percent_used > 50.0 && percent_time < 50.0 {
        create_alert(
            conn,
            period_id,
            "habit",
            "danger",
            &format!(
                "{} used at {}% while only {:.0}% of the period has elapsed",
                category.name, percent_used, percent_time
            ),
        )?;
    }
    Ok(())
}

/// A single large expense landing in the first days of a period.
fn early_large_expense(
    conn: &Connection,
    period_id: i64,
    category_id: i64,
    amount: i64,
    today: NaiveDate,
) -> Result<()> {
    let Some(category) = category_by_id(conn, category_id)? else {
        return Ok(());
    };
    if category.is_unexpected {
        return Ok(());
    }
    let Some(period) = crate::period::period_by_id(conn, period_id)? else {
        return Ok(());
    };
    let early_days = setting_i64(conn, SETTING_EARLY_DAYS, DEFAULT_EARLY_DAYS)?;
    let threshold = setting_i64(conn, SETTING_LARGE_EXPENSE, DEFAULT_LARGE_EXPENSE)?;

    let days_since_start = (today - period.start_date).num_days();
    if days_since_start <= early_days && amount > threshold {
        create_alert(
            conn,
            period_id,
            "habit",
            "warning",
            &format!("Large expense ({}) early in the period - be careful", amount),
        )?;
    }
    Ok(())
}

fn alert_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: r.get(0)?,
        period_id: r.get(1)?,
        kind: r.get(2)?,
        level: r.get(3)?,
        message: r.get(4)?,
        is_read: r.get::<_, i64>(5)? != 0,
        created_at: r.get(6)?,
    })
}

pub fn active_alerts(conn: &Connection, period_id: i64, limit: i64) -> Result<Vec<Alert>> {
    let mut stmt = conn.prepare(
        "SELECT id, period_id, type, level, message, is_read, created_at
         FROM alerts WHERE period_id=?1 AND is_read=0
         ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![period_id, limit], alert_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn mark_alert_read(conn: &Connection, alert_id: i64) -> Result<bool> {
    let n = conn.execute("UPDATE alerts SET is_read=1 WHERE id=?1", params![alert_id])?;
    Ok(n > 0)
}

/// Unread alert counts per level for a period.
pub fn alert_stats(conn: &Connection, period_id: i64) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT level, COUNT(*) FROM alerts
         WHERE period_id=?1 AND is_read=0 GROUP BY level",
    )?;
    let rows = stmt.query_map(params![period_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
