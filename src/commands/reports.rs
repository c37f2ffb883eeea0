// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Dashboard data payloads, emitted as JSON for the front-end charts.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde_json::json;

use crate::budgets::period_budgets;
use crate::period::active_period;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("budget-data", _)) => budget_data(conn)?,
        Some(("stats-series", _)) => stats_series(conn)?,
        _ => {}
    }
    Ok(())
}

/// Per-category spent/allocated pairs plus the daily expense series for
/// the active period.
fn budget_data(conn: &Connection) -> Result<()> {
    let Some(period) = active_period(conn)? else {
        println!("{}", json!({ "budgets": [], "daily_expenses": [] }));
        return Ok(());
    };

    let budgets: Vec<serde_json::Value> = period_budgets(conn, period.id)?
        .iter()
        .map(|b| {
            json!({
                "category": b.name,
                "spent": b.spent_amount,
                "allocated": b.allocated_amount,
                "color": b.color,
            })
        })
        .collect();

    let mut stmt = conn.prepare(
        "SELECT date, SUM(amount) FROM transactions
         WHERE period_id=?1 AND type='expense'
         GROUP BY date ORDER BY date",
    )?;
    let rows = stmt.query_map(params![period.id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?;
    let mut daily_expenses = Vec::new();
    for row in rows {
        let (date, amount) = row?;
        daily_expenses.push(json!({ "date": date, "amount": amount }));
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "budgets": budgets,
            "daily_expenses": daily_expenses,
        }))?
    );
    Ok(())
}

/// Income/expense/tithing/saving series aligned by date label.
fn stats_series(conn: &Connection) -> Result<()> {
    let Some(period) = active_period(conn)? else {
        println!(
            "{}",
            json!({
                "labels": [],
                "series": { "income": [], "expense": [], "tithing": [], "saving": [] }
            })
        );
        return Ok(());
    };

    let mut stmt = conn.prepare(
        "SELECT date,
                SUM(CASE WHEN type IN ('income_main','income_extra') THEN amount ELSE 0 END),
                SUM(CASE WHEN type='expense' THEN amount ELSE 0 END),
                SUM(tithing_paid),
                SUM(saving_paid)
         FROM transactions WHERE period_id=?1
         GROUP BY date ORDER BY date",
    )?;
    let rows = stmt.query_map(params![period.id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, i64>(3)?,
            r.get::<_, i64>(4)?,
        ))
    })?;

    let mut labels = Vec::new();
    let mut income = Vec::new();
    let mut expense = Vec::new();
    let mut tithing = Vec::new();
    let mut saving = Vec::new();
    for row in rows {
        let (date, inc, exp, tit, sav) = row?;
        labels.push(date);
        income.push(inc);
        expense.push(exp);
        tithing.push(tit);
        saving.push(sav);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "labels": labels,
            "series": {
                "income": income,
                "expense": expense,
                "tithing": tithing,
                "saving": saving,
            }
        }))?
    );
    Ok(())
}
