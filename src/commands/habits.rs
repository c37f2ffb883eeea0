// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::habits::{analyze_spending_habits, recommendations};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("analyze", sub)) => analyze(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn analyze(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let periods = *sub.get_one::<i64>("periods").unwrap();
    let habits = analyze_spending_habits(conn, periods)?;
    let recs = recommendations(conn)?;

    if maybe_print_json(
        sub.get_flag("json"),
        &serde_json::json!({ "habits": habits, "recommendations": recs }),
    )? {
        return Ok(());
    }

    if habits.is_empty() {
        println!("No habits detected (need at least two periods of history).");
        return Ok(());
    }
    let rows = habits
        .iter()
        .map(|h| vec![h.kind.clone(), h.category.clone(), h.message.clone()])
        .collect();
    println!("{}", pretty_table(&["Kind", "Category", "Detail"], rows));

    if !recs.is_empty() {
        let rows = recs
            .iter()
            .map(|r| vec![r.priority.clone(), r.message.clone(), r.action.clone()])
            .collect();
        println!("{}", pretty_table(&["Priority", "Recommendation", "Action"], rows));
    }
    Ok(())
}
