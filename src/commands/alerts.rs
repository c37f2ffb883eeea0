// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::alerts::{active_alerts, alert_stats, mark_alert_read};
use crate::period::active_period;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("read", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            if mark_alert_read(conn, id)? {
                println!("Alert {} marked as read", id);
            } else {
                println!("No alert with id {}", id);
            }
        }
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let Some(period) = active_period(conn)? else {
        println!("No active period.");
        return Ok(());
    };
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let alerts = active_alerts(conn, period.id, limit)?;
    if maybe_print_json(sub.get_flag("json"), &alerts)? {
        return Ok(());
    }
    let rows = alerts
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.kind.clone(),
                a.level.clone(),
                a.message.clone(),
                a.created_at.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Id", "Type", "Level", "Message", "Created"], rows)
    );
    for (level, count) in alert_stats(conn, period.id)? {
        println!("{} unread {} alert(s)", count, level);
    }
    Ok(())
}
