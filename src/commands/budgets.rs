// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::budgets::period_budgets;
use crate::period::active_period;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("status", sub)) => status(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let Some(period) = active_period(conn)? else {
        println!("No active period.");
        return Ok(());
    };
    let budgets = period_budgets(conn, period.id)?;
    if maybe_print_json(sub.get_flag("json"), &budgets)? {
        return Ok(());
    }
    let rows = budgets
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.allocated_amount.to_string(),
                b.spent_amount.to_string(),
                b.remaining.to_string(),
                format!("{:.1}%", b.percentage_used),
                b.status.as_str().to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Allocated", "Spent", "Remaining", "Used", "Status"],
            rows
        )
    );
    Ok(())
}
