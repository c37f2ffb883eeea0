// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Structured financial snapshots. Everything the assistant (and the JSON
//! exports) see about the ledger is assembled here, so the chat flow, the
//! dispatcher, and the batch jobs all speak the same shapes.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::alerts::active_alerts;
use crate::budgets::period_budgets;
use crate::habits::{analyze_spending_habits, recommendations, Habit, Recommendation};
use crate::models::{Alert, BudgetView, Category, Notification, Period};
use crate::params::{budget_percentages, parameters_by_version};
use crate::period::{
    active_period, period_by_id, period_totals, recent_period_summaries, PeriodSummary,
};

pub const SYSTEM_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseOverview {
    pub periods_count: i64,
    pub categories_count: i64,
    pub transaction_count: i64,
    pub total_income: i64,
    pub total_extra_income: i64,
    pub total_expenses: i64,
    pub first_transaction_date: Option<NaiveDate>,
    pub latest_transaction_date: Option<NaiveDate>,
}

pub fn database_overview(conn: &Connection) -> Result<DatabaseOverview> {
    let (total_income, total_extra_income, total_expenses, transaction_count) = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type='income_main' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN type='income_extra' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN type='expense' THEN amount ELSE 0 END), 0),
            COUNT(*)
         FROM transactions",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    let periods_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM financial_periods", [], |r| r.get(0))?;
    let categories_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM budget_categories", [], |r| r.get(0))?;
    let (first_transaction_date, latest_transaction_date) = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM transactions",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(DatabaseOverview {
        periods_count,
        categories_count,
        transaction_count,
        total_income,
        total_extra_income,
        total_expenses,
        first_transaction_date,
        latest_transaction_date,
    })
}

/// Ledger row joined with its category, as exposed to the assistant.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    pub id: i64,
    pub period_id: i64,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub amount: i64,
    pub description: String,
    pub comment: String,
    pub date: NaiveDate,
    pub tithing_paid: i64,
    pub saving_paid: i64,
    pub balance_after: i64,
}

fn detail_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionDetail> {
    Ok(TransactionDetail {
        id: r.get(0)?,
        period_id: r.get(1)?,
        tx_type: r.get(2)?,
        category_id: r.get(3)?,
        category_name: r.get(4)?,
        color: r.get(5)?,
        icon: r.get(6)?,
        amount: r.get(7)?,
        description: r.get(8)?,
        comment: r.get(9)?,
        date: r.get(10)?,
        tithing_paid: r.get(11)?,
        saving_paid: r.get(12)?,
        balance_after: r.get(13)?,
    })
}

const DETAIL_COLS: &str = "t.id, t.period_id, t.type, t.category_id, c.name, c.color, c.icon,
        t.amount, t.description, t.comment, t.date, t.tithing_paid, t.saving_paid,
        t.balance_after";

pub fn transactions_for_period(
    conn: &Connection,
    period_id: i64,
    newest_first: bool,
    limit: Option<i64>,
) -> Result<Vec<TransactionDetail>> {
    let order = if newest_first {
        "ORDER BY t.date DESC, t.created_at DESC, t.id DESC"
    } else {
        "ORDER BY t.date, t.created_at, t.id"
    };
    let mut sql = format!(
        "SELECT {DETAIL_COLS} FROM transactions t
         LEFT JOIN budget_categories c ON t.category_id = c.id
         WHERE t.period_id=?1 {order}"
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![period_id], detail_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn transactions_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<TransactionDetail>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DETAIL_COLS} FROM transactions t
         LEFT JOIN budget_categories c ON t.category_id = c.id
         WHERE t.date BETWEEN ?1 AND ?2
         ORDER BY t.date, t.created_at, t.id"
    ))?;
    let rows = stmt.query_map(params![start, end], detail_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStat {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub total_expenses: i64,
    pub expense_count: i64,
}

pub fn category_stats(conn: &Connection, period_id: i64) -> Result<Vec<CategoryStat>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.icon, c.color,
                COALESCE(SUM(CASE WHEN t.type='expense' THEN t.amount ELSE 0 END), 0) AS total,
                COALESCE(SUM(CASE WHEN t.type='expense' THEN 1 ELSE 0 END), 0)
         FROM budget_categories c
         LEFT JOIN transactions t ON t.category_id = c.id AND t.period_id=?1
         GROUP BY c.id ORDER BY total DESC",
    )?;
    let rows = stmt.query_map(params![period_id], |r| {
        Ok(CategoryStat {
            id: r.get(0)?,
            name: r.get(1)?,
            icon: r.get(2)?,
            color: r.get(3)?,
            total_expenses: r.get(4)?,
            expense_count: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct LargestExpense {
    pub date: NaiveDate,
    pub amount: i64,
    pub description: String,
    pub category_name: Option<String>,
}

pub fn largest_expenses(conn: &Connection, period_id: i64, limit: i64) -> Result<Vec<LargestExpense>> {
    let mut stmt = conn.prepare(
        "SELECT t.date, t.amount, t.description, c.name
         FROM transactions t
         LEFT JOIN budget_categories c ON t.category_id = c.id
         WHERE t.period_id=?1 AND t.type='expense'
         ORDER BY t.amount DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![period_id, limit], |r| {
        Ok(LargestExpense {
            date: r.get(0)?,
            amount: r.get(1)?,
            description: r.get(2)?,
            category_name: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeSummaryRow {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub total: i64,
    pub count: i64,
}

pub fn income_summary(conn: &Connection, period_id: i64) -> Result<Vec<IncomeSummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT type, SUM(amount), COUNT(*)
         FROM transactions
         WHERE period_id=?1 AND type IN ('income_main','income_extra')
         GROUP BY type",
    )?;
    let rows = stmt.query_map(params![period_id], |r| {
        Ok(IncomeSummaryRow {
            tx_type: r.get(0)?,
            total: r.get(1)?,
            count: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// Range snapshot: the AI-notification export body and the date-bounded
// dispatcher responses.

#[derive(Debug, Clone, Serialize)]
pub struct RangeMetadata {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub export_date: String,
    pub system_version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RangeSummary {
    pub income_main: i64,
    pub income_extra: i64,
    pub expense: i64,
    pub tithing: i64,
    pub saving: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub income: i64,
    pub expense: i64,
    pub tithing: i64,
    pub saving: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRangeTotal {
    pub category_id: i64,
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub total: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeData {
    pub metadata: RangeMetadata,
    pub periods: Vec<Period>,
    pub summary: RangeSummary,
    pub daily: Vec<DailyTotals>,
    pub by_category: Vec<CategoryRangeTotal>,
    pub transactions: Vec<TransactionDetail>,
}

pub fn range_data(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDateTime,
) -> Result<RangeData> {
    let transactions = transactions_in_range(conn, start, end)?;

    let periods = {
        let mut stmt = conn.prepare(
            "SELECT id FROM financial_periods
             WHERE end_date >= ?1 AND start_date <= ?2
             ORDER BY start_date",
        )?;
        let ids = stmt.query_map(params![start, end], |r| r.get::<_, i64>(0))?;
        let mut out = Vec::new();
        for id in ids {
            if let Some(p) = period_by_id(conn, id?)? {
                out.push(p);
            }
        }
        out
    };

    let mut summary = RangeSummary::default();
    let mut daily: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    let mut by_category: BTreeMap<i64, CategoryRangeTotal> = BTreeMap::new();

    for tx in &transactions {
        let day = daily.entry(tx.date).or_insert(DailyTotals {
            date: tx.date,
            income: 0,
            expense: 0,
            tithing: 0,
            saving: 0,
        });
        match tx.tx_type.as_str() {
            "income_main" => {
                summary.income_main += tx.amount;
                day.income += tx.amount;
            }
            "income_extra" => {
                summary.income_extra += tx.amount;
                day.income += tx.amount;
            }
            "expense" => {
                summary.expense += tx.amount;
                day.expense += tx.amount;
                let entry = by_category
                    .entry(tx.category_id.unwrap_or(0))
                    .or_insert(CategoryRangeTotal {
                        category_id: tx.category_id.unwrap_or(0),
                        name: tx.category_name.clone(),
                        color: tx.color.clone(),
                        icon: tx.icon.clone(),
                        total: 0,
                        count: 0,
                    });
                entry.total += tx.amount;
                entry.count += 1;
            }
            _ => {}
        }
        summary.tithing += tx.tithing_paid;
        summary.saving += tx.saving_paid;
        day.tithing += tx.tithing_paid;
        day.saving += tx.saving_paid;
    }

    Ok(RangeData {
        metadata: RangeMetadata {
            range_start: start,
            range_end: end,
            export_date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            system_version: SYSTEM_VERSION.to_string(),
        },
        periods,
        summary,
        daily: daily.into_values().collect(),
        by_category: by_category.into_values().collect(),
        transactions,
    })
}

// Full assistant snapshot

#[derive(Debug, Clone, Serialize)]
pub struct ContextPeriod {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_income: i64,
    pub tithing_amount: i64,
    pub saving_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextParameters {
    pub version: i64,
    pub default_income: i64,
    pub currency: String,
    pub tithing_percent: i64,
    pub main_saving_percent: i64,
    pub extra_saving_percent: i64,
    pub budget_percentages: BTreeMap<i64, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub total_budget: i64,
    pub total_spent: i64,
    pub remaining_budget: i64,
    pub total_income: i64,
    pub total_extra_income: i64,
    pub total_expenses: i64,
    pub total_tithing: i64,
    pub total_saving: i64,
    pub days_left: i64,
    pub daily_budget: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialContext {
    pub period: Option<ContextPeriod>,
    pub parameters: Option<ContextParameters>,
    pub summary: Option<ContextSummary>,
    pub budgets: Vec<BudgetView>,
    pub recent_transactions: Vec<TransactionDetail>,
    pub all_transactions: Vec<TransactionDetail>,
    pub category_stats: Vec<CategoryStat>,
    pub largest_expenses: Vec<LargestExpense>,
    pub income_summary: Vec<IncomeSummaryRow>,
    pub alerts_active: Vec<Alert>,
    pub notifications: Vec<Notification>,
    pub habits: Vec<Habit>,
    pub recommendations: Vec<Recommendation>,
    pub categories: Vec<Category>,
    pub recent_periods: Vec<PeriodSummary>,
    pub database_overview: DatabaseOverview,
}

/// Assemble the full snapshot for one period (the active one when no id is
/// given). With no period at all, only the database overview is populated.
pub fn financial_context(
    conn: &mut Connection,
    period_id: Option<i64>,
    today: NaiveDate,
) -> Result<FinancialContext> {
    let period = match period_id {
        Some(id) => period_by_id(conn, id)?,
        None => active_period(conn)?,
    };

    let Some(period) = period else {
        return Ok(FinancialContext {
            period: None,
            parameters: None,
            summary: None,
            budgets: Vec::new(),
            recent_transactions: Vec::new(),
            all_transactions: Vec::new(),
            category_stats: Vec::new(),
            largest_expenses: Vec::new(),
            income_summary: Vec::new(),
            alerts_active: Vec::new(),
            notifications: Vec::new(),
            habits: Vec::new(),
            recommendations: Vec::new(),
            categories: crate::utils::all_categories(conn)?,
            recent_periods: Vec::new(),
            database_overview: database_overview(conn)?,
        });
    };

    let parameters = parameters_by_version(conn, period.parameters_version)?;
    let percentages = budget_percentages(conn, parameters.id)?;
    let budgets = period_budgets(conn, period.id)?;
    let totals = period_totals(conn, period.id)?;

    let remaining_budget = totals.total_budget - totals.total_spent;
    let days_left = ((period.end_date - today).num_days() + 1).max(0);
    let daily_budget = if days_left > 0 {
        remaining_budget / days_left
    } else {
        0
    };

    Ok(FinancialContext {
        period: Some(ContextPeriod {
            id: period.id,
            start_date: period.start_date,
            end_date: period.end_date,
            initial_income: period.initial_income,
            tithing_amount: period.tithing_amount,
            saving_amount: period.saving_amount,
        }),
        parameters: Some(ContextParameters {
            version: parameters.id,
            default_income: parameters.default_income,
            currency: parameters.currency.clone(),
            tithing_percent: parameters.tithing_percent,
            main_saving_percent: parameters.main_saving_percent,
            extra_saving_percent: parameters.extra_saving_percent,
            budget_percentages: percentages,
        }),
        summary: Some(ContextSummary {
            total_budget: totals.total_budget,
            total_spent: totals.total_spent,
            remaining_budget,
            total_income: totals.total_income,
            total_extra_income: totals.total_extra_income,
            total_expenses: totals.total_expenses,
            total_tithing: totals.total_tithing,
            total_saving: totals.total_saving,
            days_left,
            daily_budget,
        }),
        recent_transactions: transactions_for_period(conn, period.id, true, Some(30))?,
        all_transactions: transactions_for_period(conn, period.id, false, None)?,
        category_stats: category_stats(conn, period.id)?,
        largest_expenses: largest_expenses(conn, period.id, 10)?,
        income_summary: income_summary(conn, period.id)?,
        alerts_active: active_alerts(conn, period.id, 20)?,
        notifications: crate::notify::overlapping_for_period(
            conn,
            period.start_date,
            period.end_date,
        )?,
        habits: analyze_spending_habits(conn, 3)?,
        recommendations: recommendations(conn)?,
        categories: crate::utils::all_categories(conn)?,
        recent_periods: recent_period_summaries(conn, 6)?,
        budgets,
        database_overview: database_overview(conn)?,
    })
}
