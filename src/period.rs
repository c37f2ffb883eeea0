// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Financial period lifecycle: creation, automatic rollover, and
//! re-synchronization of an in-flight period after a parameter change.
//! There is never more than one active period; the active row is re-read
//! from the database on every operation rather than cached.

use anyhow::{Context, Result};
use chrono::{Months, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::allocation::{allocate_by_percentages, split_main_income};
use crate::models::{Period, TxType};
use crate::params::{budget_percentages, current_parameters, parameters_by_version};

fn period_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Period> {
    Ok(Period {
        id: r.get(0)?,
        start_date: r.get(1)?,
        end_date: r.get(2)?,
        parameters_version: r.get(3)?,
        initial_income: r.get(4)?,
        tithing_amount: r.get(5)?,
        saving_amount: r.get(6)?,
        is_active: r.get::<_, i64>(7)? != 0,
    })
}

const PERIOD_COLS: &str = "id, start_date, end_date, parameters_version, initial_income, \
                           tithing_amount, saving_amount, is_active";

pub fn active_period(conn: &Connection) -> Result<Option<Period>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {PERIOD_COLS} FROM financial_periods
                 WHERE is_active=1 ORDER BY start_date DESC LIMIT 1"
            ),
            [],
            period_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn period_by_id(conn: &Connection, id: i64) -> Result<Option<Period>> {
    let row = conn
        .query_row(
            &format!("SELECT {PERIOD_COLS} FROM financial_periods WHERE id=?1"),
            params![id],
            period_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Period whose window contains `date`, latest start first on overlap.
pub fn period_on_date(conn: &Connection, date: NaiveDate) -> Result<Option<Period>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {PERIOD_COLS} FROM financial_periods
                 WHERE start_date <= ?1 AND end_date >= ?1
                 ORDER BY start_date DESC LIMIT 1"
            ),
            params![date],
            period_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn all_periods(conn: &Connection, limit: i64) -> Result<Vec<Period>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERIOD_COLS} FROM financial_periods ORDER BY start_date DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], period_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Create a new active period seeded from a primary income.
///
/// One transaction: deactivate the old period, insert the new one with a
/// one-month window, seed a budget row per category from the percentage
/// table applied to the spendable part, and append the `income_main`
/// transaction that records the seed. Nothing survives a failure.
pub fn create_period(
    conn: &mut Connection,
    income: i64,
    parameters_version: i64,
    start_date: NaiveDate,
) -> Result<Period> {
    let parameters = parameters_by_version(conn, parameters_version)?;
    let percentages = budget_percentages(conn, parameters.id)?;

    let end_date = start_date
        .checked_add_months(Months::new(1))
        .context("Period end date out of range")?;
    let split = split_main_income(income, &parameters);
    let allocation = allocate_by_percentages(split.spendable, &percentages);

    let tx = conn.transaction()?;
    tx.execute("UPDATE financial_periods SET is_active=0 WHERE is_active=1", [])?;
    tx.execute(
        "INSERT INTO financial_periods
         (start_date, end_date, parameters_version, initial_income, tithing_amount, saving_amount, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![
            start_date,
            end_date,
            parameters.id,
            income,
            split.tithing,
            split.saving
        ],
    )?;
    let period_id = tx.last_insert_rowid();

    for (&category_id, &allocated) in &allocation {
        tx.execute(
            "INSERT INTO period_budgets(period_id, category_id, allocated_amount, spent_amount)
             VALUES (?1, ?2, ?3, 0)",
            params![period_id, category_id, allocated],
        )?;
    }

    tx.execute(
        "INSERT INTO transactions
         (period_id, type, category_id, amount, description, comment, date,
          tithing_paid, saving_paid, balance_after)
         VALUES (?1, ?2, NULL, ?3, ?4, '', ?5, ?6, ?7, ?8)",
        params![
            period_id,
            TxType::IncomeMain.as_str(),
            income,
            "Main income",
            start_date,
            split.tithing,
            split.saving,
            split.spendable
        ],
    )?;
    tx.commit()?;

    info!(period_id, %start_date, %end_date, income, "created period");
    period_by_id(conn, period_id)?.context("Period vanished after insert")
}

/// Automatic rollover: when `today` has reached the active period's end
/// date, a fresh period is created from the current default income. Returns
/// whether a rollover happened.
pub fn check_period_end(conn: &mut Connection, today: NaiveDate) -> Result<bool> {
    let Some(period) = active_period(conn)? else {
        return Ok(false);
    };
    if today < period.end_date {
        return Ok(false);
    }
    let parameters = current_parameters(conn)?;
    create_period(conn, parameters.default_income, parameters.id, today)?;
    Ok(true)
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub synced: bool,
    pub period_id: Option<i64>,
    pub total_income: i64,
    pub spendable: i64,
}

/// Re-derive the active period's split from every income transaction it
/// already holds and re-apply the category allocation, reconciling budget
/// rows in place: present categories get the new allocated amount, new ones
/// are inserted with zero spent, vanished ones are zeroed but never
/// deleted. Runs when the global parameters change so an in-flight period
/// follows the new table without losing recorded spending.
pub fn synchronize_active_period(
    conn: &mut Connection,
    parameters_version: Option<i64>,
) -> Result<SyncResult> {
    let Some(period) = active_period(conn)? else {
        return Ok(SyncResult {
            synced: false,
            period_id: None,
            total_income: 0,
            spendable: 0,
        });
    };

    let parameters = match parameters_version {
        Some(v) => parameters_by_version(conn, v)?,
        None => current_parameters(conn)?,
    };

    let (main_income, extra_income): (i64, i64) = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type='income_main' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN type='income_extra' THEN amount ELSE 0 END), 0)
         FROM transactions WHERE period_id=?1",
        params![period.id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let total_income = main_income + extra_income;

    let tithing = total_income * parameters.tithing_percent / 100;
    let saving = main_income * parameters.main_saving_percent / 100
        + extra_income * parameters.extra_saving_percent / 100;
    let spendable = (total_income - tithing - saving).max(0);

    let percentages = budget_percentages(conn, parameters.id)?;
    let allocation = allocate_by_percentages(spendable, &percentages);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE financial_periods
         SET parameters_version=?1, tithing_amount=?2, saving_amount=?3
         WHERE id=?4",
        params![parameters.id, tithing, saving, period.id],
    )?;

    if !allocation.is_empty() {
        let existing: Vec<(i64, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT id, category_id FROM period_budgets WHERE period_id=?1",
            )?;
            let rows = stmt.query_map(params![period.id], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };

        for (&category_id, &allocated) in &allocation {
            match existing.iter().find(|(_, cat)| *cat == category_id) {
                Some((budget_id, _)) => {
                    tx.execute(
                        "UPDATE period_budgets SET allocated_amount=?1 WHERE id=?2",
                        params![allocated, budget_id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO period_budgets(period_id, category_id, allocated_amount, spent_amount)
                         VALUES (?1, ?2, ?3, 0)",
                        params![period.id, category_id, allocated],
                    )?;
                }
            }
        }
        for (budget_id, category_id) in &existing {
            if !allocation.contains_key(category_id) {
                tx.execute(
                    "UPDATE period_budgets SET allocated_amount=0 WHERE id=?1",
                    params![budget_id],
                )?;
            }
        }
    }
    tx.commit()?;

    info!(period_id = period.id, total_income, spendable, "synchronized active period");
    Ok(SyncResult {
        synced: true,
        period_id: Some(period.id),
        total_income,
        spendable,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodTotals {
    pub total_income: i64,
    pub total_extra_income: i64,
    pub total_expenses: i64,
    pub total_tithing: i64,
    pub total_saving: i64,
    pub total_budget: i64,
    pub total_spent: i64,
}

pub fn period_totals(conn: &Connection, period_id: i64) -> Result<PeriodTotals> {
    let (total_income, total_extra_income, total_expenses, total_tithing, total_saving) = conn
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN type='income_main' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type='income_extra' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type='expense' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(tithing_paid), 0),
                COALESCE(SUM(saving_paid), 0)
             FROM transactions WHERE period_id=?1",
            params![period_id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                ))
            },
        )?;
    let (total_budget, total_spent) = conn.query_row(
        "SELECT COALESCE(SUM(allocated_amount), 0), COALESCE(SUM(spent_amount), 0)
         FROM period_budgets WHERE period_id=?1",
        params![period_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(PeriodTotals {
        total_income,
        total_extra_income,
        total_expenses,
        total_tithing,
        total_saving,
        total_budget,
        total_spent,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub period_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_income: i64,
    pub total_extra_income: i64,
    pub total_expenses: i64,
    pub total_budget: i64,
    pub total_spent: i64,
}

pub fn recent_period_summaries(conn: &Connection, limit: i64) -> Result<Vec<PeriodSummary>> {
    let periods = all_periods(conn, limit)?;
    let mut out = Vec::with_capacity(periods.len());
    for p in periods {
        let totals = period_totals(conn, p.id)?;
        out.push(PeriodSummary {
            period_id: p.id,
            start_date: p.start_date,
            end_date: p.end_date,
            total_income: totals.total_income,
            total_extra_income: totals.total_extra_income,
            total_expenses: totals.total_expenses,
            total_budget: totals.total_budget,
            total_spent: totals.total_spent,
        });
    }
    Ok(out)
}
