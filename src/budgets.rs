// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-side views over `period_budgets`, joined with the category catalog
//! and decorated with the derived usage fields.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::allocation::{budget_status, budget_usage};
use crate::models::BudgetView;

fn view_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<BudgetView> {
    let allocated: i64 = r.get(7)?;
    let spent: i64 = r.get(8)?;
    let percentage_used = budget_usage(allocated, spent);
    Ok(BudgetView {
        id: r.get(0)?,
        period_id: r.get(1)?,
        category_id: r.get(2)?,
        name: r.get(3)?,
        icon: r.get(4)?,
        color: r.get(5)?,
        is_unexpected: r.get::<_, i64>(6)? != 0,
        allocated_amount: allocated,
        spent_amount: spent,
        remaining: allocated - spent,
        percentage_used,
        status: budget_status(percentage_used),
        is_over: spent > allocated,
    })
}

const VIEW_SQL: &str = "SELECT pb.id, pb.period_id, pb.category_id, c.name, c.icon, c.color,
            c.is_unexpected, pb.allocated_amount, pb.spent_amount
     FROM period_budgets pb
     JOIN budget_categories c ON pb.category_id = c.id";

/// All budgets of a period in catalog order.
pub fn period_budgets(conn: &Connection, period_id: i64) -> Result<Vec<BudgetView>> {
    let mut stmt =
        conn.prepare(&format!("{VIEW_SQL} WHERE pb.period_id=?1 ORDER BY c.position"))?;
    let rows = stmt.query_map(params![period_id], view_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn category_budget(
    conn: &Connection,
    period_id: i64,
    category_id: i64,
) -> Result<Option<BudgetView>> {
    let row = conn
        .query_row(
            &format!("{VIEW_SQL} WHERE pb.period_id=?1 AND pb.category_id=?2 LIMIT 1"),
            params![period_id, category_id],
            view_from_row,
        )
        .optional()?;
    Ok(row)
}
