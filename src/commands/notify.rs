// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use crate::ai::GeminiClient;
use crate::db::exports_dir;
use crate::notify::{
    mark_all_read, mark_read, notifications, run, RunStatus, Timeframe,
};
use crate::utils::{date_or_today, maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("run", sub)) => run_job(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("read", sub)) => read(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn run_job(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let timeframes: Vec<Timeframe> = match sub.get_one::<String>("timeframe") {
        Some(s) => match Timeframe::parse(s) {
            Some(tf) => vec![tf],
            None => anyhow::bail!("Invalid timeframe '{}'. Use week, month or year.", s),
        },
        None => Timeframe::ALL.to_vec(),
    };
    let dry_run = sub.get_flag("dry-run");
    let force = sub.get_flag("force");
    let today = date_or_today(sub.get_one::<String>("date"))?;

    let client = GeminiClient::from_settings(conn)?;
    let exports = exports_dir()?;
    let outcomes = run(
        conn,
        &client,
        &timeframes,
        dry_run,
        force,
        today,
        Utc::now().naive_utc(),
        &exports,
    )?;

    for outcome in &outcomes {
        let label = format!(
            "{} {} to {}",
            outcome.timeframe.as_str(),
            outcome.range_start,
            outcome.range_end
        );
        match outcome.status {
            RunStatus::NotDue => println!("{}: not due today (use --force)", label),
            RunStatus::AlreadyGenerated => println!("{}: already generated", label),
            RunStatus::DryRun => println!("{}: dry-run, export written", label),
            RunStatus::Created => println!("{}: notification recorded", label),
        }
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let timeframe = sub
        .get_one::<String>("timeframe")
        .and_then(|s| Timeframe::parse(s));
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let items = notifications(conn, limit, timeframe)?;
    if maybe_print_json(sub.get_flag("json"), &items)? {
        return Ok(());
    }
    let rows = items
        .iter()
        .map(|n| {
            vec![
                n.id.to_string(),
                n.timeframe.clone(),
                format!("{} to {}", n.range_start, n.range_end),
                if n.is_read { "read".into() } else { "unread".into() },
                n.created_at.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Id", "Timeframe", "Range", "State", "Created"], rows)
    );
    Ok(())
}

fn read(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    if sub.get_flag("all") {
        let n = mark_all_read(conn)?;
        println!("Marked {} notifications as read", n);
        return Ok(());
    }
    match sub.get_one::<i64>("id") {
        Some(&id) => {
            if mark_read(conn, id)? {
                println!("Notification {} marked as read", id);
            } else {
                println!("No notification with id {}", id);
            }
        }
        None => anyhow::bail!("Pass --id <id> or --all"),
    }
    Ok(())
}
