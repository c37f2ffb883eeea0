// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::utils::pretty_table;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Ledger/budget drift: spent_amount must equal the summed expenses.
    let mut stmt = conn.prepare(
        "SELECT pb.period_id, pb.category_id, pb.spent_amount,
                COALESCE((SELECT SUM(t.amount) FROM transactions t
                          WHERE t.period_id=pb.period_id AND t.category_id=pb.category_id
                            AND t.type='expense'), 0) AS ledger_spent
         FROM period_budgets pb",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let period_id: i64 = r.get(0)?;
        let category_id: i64 = r.get(1)?;
        let spent: i64 = r.get(2)?;
        let ledger_spent: i64 = r.get(3)?;
        if spent != ledger_spent {
            rows.push(vec![
                "spent_mismatch".into(),
                format!(
                    "period {} category {}: budget says {}, ledger says {}",
                    period_id, category_id, spent, ledger_spent
                ),
            ]);
        }
    }

    // 2) Singleton invariants
    let active_periods: i64 = conn.query_row(
        "SELECT COUNT(*) FROM financial_periods WHERE is_active=1",
        [],
        |r| r.get(0),
    )?;
    if active_periods > 1 {
        rows.push(vec![
            "multiple_active_periods".into(),
            active_periods.to_string(),
        ]);
    }
    let active_params: i64 =
        conn.query_row("SELECT COUNT(*) FROM parameters WHERE is_active=1", [], |r| r.get(0))?;
    if active_params > 1 {
        rows.push(vec![
            "multiple_active_parameters".into(),
            active_params.to_string(),
        ]);
    }

    // 3) Active percentage table must sum to 100
    let mut stmt3 = conn.prepare(
        "SELECT p.id, COALESCE(SUM(bp.percentage), 0)
         FROM parameters p
         LEFT JOIN budget_percentages bp ON bp.parameters_version = p.id
         WHERE p.is_active=1 GROUP BY p.id",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let version: i64 = r.get(0)?;
        let total: i64 = r.get(1)?;
        if total != 100 && total != 0 {
            rows.push(vec![
                "percentages_not_100".into(),
                format!("version {} sums to {}", version, total),
            ]);
        }
    }

    // 4) Expenses pointing at categories with no budget row in their period
    let mut stmt4 = conn.prepare(
        "SELECT t.id, t.period_id, t.category_id FROM transactions t
         WHERE t.type='expense' AND t.category_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM period_budgets pb
                           WHERE pb.period_id=t.period_id AND pb.category_id=t.category_id)",
    )?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let tx_id: i64 = r.get(0)?;
        let period_id: i64 = r.get(1)?;
        let category_id: i64 = r.get(2)?;
        rows.push(vec![
            "expense_without_budget".into(),
            format!("tx {} (period {}, category {})", tx_id, period_id, category_id),
        ]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
