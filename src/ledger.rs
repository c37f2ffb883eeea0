// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Append-only transaction ledger. Expenses are admission-controlled
//! against the category budget before anything is written; incomes mutate
//! the active period's running totals and its budgets in the same
//! transaction as the ledger row.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tracing::info;

use crate::allocation::{
    allocate_by_percentages, distribute_proportionally, split_extra_income, split_main_income,
};
use crate::budgets::category_budget;
use crate::errors::StewardError;
use crate::models::TxType;
use crate::params::{budget_percentages, current_parameters};
use crate::period::active_period;
use crate::utils::category_by_id;

/// Record an expense against the active period.
///
/// Hard rules, checked before any write: the amount is positive; a
/// category flagged `is_unexpected` requires a non-empty comment; the
/// amount may not exceed what is left in the category budget (the error
/// carries the available amount). The ledger row and the spent-amount
/// increment commit together.
pub fn record_expense(
    conn: &mut Connection,
    category_id: i64,
    amount: i64,
    description: &str,
    comment: Option<&str>,
    today: NaiveDate,
) -> Result<i64> {
    if amount <= 0 {
        return Err(StewardError::Validation("Amount must be positive".into()).into());
    }
    if description.trim().is_empty() {
        return Err(StewardError::Validation("Description is required".into()).into());
    }

    let period = active_period(conn)?.ok_or(StewardError::NoActivePeriod)?;
    let category = category_by_id(conn, category_id)?
        .ok_or_else(|| StewardError::NotFound(format!("Category {}", category_id)))?;

    let comment = comment.map(str::trim).unwrap_or("");
    if category.is_unexpected && comment.is_empty() {
        return Err(StewardError::Validation(
            "A comment is mandatory for unexpected expenses".into(),
        )
        .into());
    }

    let budget = category_budget(conn, period.id, category_id)?
        .ok_or_else(|| StewardError::NotFound(format!("Budget for '{}'", category.name)))?;
    let available = budget.allocated_amount - budget.spent_amount;
    if amount > available {
        return Err(StewardError::OverBudget { available }.into());
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO transactions
         (period_id, type, category_id, amount, description, comment, date,
          tithing_paid, saving_paid, balance_after)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8)",
        params![
            period.id,
            TxType::Expense.as_str(),
            category_id,
            amount,
            description,
            comment,
            today,
            available - amount
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE period_budgets SET spent_amount = spent_amount + ?1
         WHERE period_id=?2 AND category_id=?3",
        params![amount, period.id, category_id],
    )?;
    tx.commit()?;

    info!(transaction_id, category = %category.name, amount, "expense recorded");

    crate::alerts::check_budget_alerts(conn, period.id, category_id)?;
    crate::alerts::check_habit_signals(conn, period.id, category_id, amount, today)?;

    Ok(transaction_id)
}

/// Record an additional primary income into the active period: cumulative
/// tithing/saving go up, each category budget grows by its percentage share
/// of the new spendable, and the ledger row is appended. One transaction.
pub fn record_main_income(
    conn: &mut Connection,
    amount: i64,
    description: &str,
    today: NaiveDate,
) -> Result<i64> {
    if amount <= 0 {
        return Err(StewardError::Validation("Amount must be positive".into()).into());
    }
    let period = active_period(conn)?.ok_or(StewardError::NoActivePeriod)?;
    let parameters = current_parameters(conn)?;
    let split = split_main_income(amount, &parameters);
    let percentages = budget_percentages(conn, parameters.id)?;
    let allocation = allocate_by_percentages(split.spendable, &percentages);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE financial_periods
         SET tithing_amount = tithing_amount + ?1,
             saving_amount = saving_amount + ?2,
             initial_income = ?3
         WHERE id=?4",
        params![split.tithing, split.saving, amount, period.id],
    )?;
    for (&category_id, &additional) in &allocation {
        tx.execute(
            "UPDATE period_budgets SET allocated_amount = allocated_amount + ?1
             WHERE period_id=?2 AND category_id=?3",
            params![additional, period.id, category_id],
        )?;
    }
    tx.execute(
        "INSERT INTO transactions
         (period_id, type, category_id, amount, description, comment, date,
          tithing_paid, saving_paid, balance_after)
         VALUES (?1, ?2, NULL, ?3, ?4, '', ?5, ?6, ?7, ?8)",
        params![
            period.id,
            TxType::IncomeMain.as_str(),
            amount,
            description,
            today,
            split.tithing,
            split.saving,
            split.spendable
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();
    tx.commit()?;

    info!(transaction_id, amount, "main income recorded");
    Ok(transaction_id)
}

/// Record an occasional income: its spendable part is spread over the
/// existing budgets in proportion to their current allocations (each share
/// rounded on its own), the tithing share is parked as deferred tithing,
/// and the ledger row is appended. One transaction.
pub fn record_extra_income(
    conn: &mut Connection,
    amount: i64,
    description: &str,
    today: NaiveDate,
) -> Result<i64> {
    if amount <= 0 {
        return Err(StewardError::Validation("Amount must be positive".into()).into());
    }
    let period = active_period(conn)?.ok_or(StewardError::NoActivePeriod)?;
    let parameters = current_parameters(conn)?;
    let split = split_extra_income(amount, &parameters);

    let budgets: Vec<(i64, i64)> = {
        let mut stmt = conn.prepare(
            "SELECT id, allocated_amount FROM period_budgets WHERE period_id=?1",
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
    let additions = distribute_proportionally(split.spendable, &budgets);

    let tx = conn.transaction()?;
    for (budget_id, additional) in &additions {
        tx.execute(
            "UPDATE period_budgets SET allocated_amount = allocated_amount + ?1 WHERE id=?2",
            params![additional, budget_id],
        )?;
    }
    if split.tithing > 0 {
        tx.execute(
            "INSERT INTO deferred_tithing(amount, source_period_id, target_period_id, is_paid)
             VALUES (?1, ?2, NULL, 0)",
            params![split.tithing, period.id],
        )?;
    }
    let remaining = period_remaining(&tx, period.id)?;
    tx.execute(
        "INSERT INTO transactions
         (period_id, type, category_id, amount, description, comment, date,
          tithing_paid, saving_paid, balance_after)
         VALUES (?1, ?2, NULL, ?3, ?4, '', ?5, ?6, ?7, ?8)",
        params![
            period.id,
            TxType::IncomeExtra.as_str(),
            amount,
            description,
            today,
            split.tithing,
            split.saving,
            remaining
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();
    tx.commit()?;

    info!(transaction_id, amount, "extra income recorded");
    Ok(transaction_id)
}

/// Allocated minus spent across the whole period.
pub fn period_remaining(conn: &Connection, period_id: i64) -> Result<i64> {
    let remaining: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(allocated_amount), 0) - COALESCE(SUM(spent_amount), 0)
             FROM period_budgets WHERE period_id=?1",
            params![period_id],
            |r| r.get(0),
        )
        .context("Compute period remaining")?;
    Ok(remaining)
}
