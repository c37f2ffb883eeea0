// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::params::current_parameters;
use crate::period::{
    active_period, all_periods, check_period_end, create_period, period_totals,
    synchronize_active_period,
};
use crate::utils::{date_or_today, format_currency, maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("status", sub)) => status(conn, sub)?,
        Some(("new", sub)) => new(conn, sub)?,
        Some(("check", sub)) => check(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("sync", _)) => sync(conn)?,
        _ => {}
    }
    Ok(())
}

fn status(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let Some(period) = active_period(conn)? else {
        println!("No active period. Start one with 'steward period new'.");
        return Ok(());
    };
    let totals = period_totals(conn, period.id)?;
    let params = current_parameters(conn)?;

    if maybe_print_json(
        sub.get_flag("json"),
        &serde_json::json!({ "period": period, "totals": totals }),
    )? {
        return Ok(());
    }

    let ccy = &params.currency;
    let rows = vec![
        vec!["Window".into(), format!("{} to {}", period.start_date, period.end_date)],
        vec!["Initial income".into(), format_currency(period.initial_income, ccy)],
        vec!["Tithing".into(), format_currency(period.tithing_amount, ccy)],
        vec!["Saving".into(), format_currency(period.saving_amount, ccy)],
        vec!["Total budget".into(), format_currency(totals.total_budget, ccy)],
        vec!["Total spent".into(), format_currency(totals.total_spent, ccy)],
        vec![
            "Remaining".into(),
            format_currency(totals.total_budget - totals.total_spent, ccy),
        ],
    ];
    let title = format!("Period #{}", period.id);
    println!("{}", pretty_table(&[title.as_str(), ""], rows));
    Ok(())
}

fn new(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = date_or_today(sub.get_one::<String>("date"))?;
    let params = current_parameters(conn)?;
    let income = sub
        .get_one::<i64>("income")
        .copied()
        .unwrap_or(params.default_income);
    let period = create_period(conn, income, params.id, date)?;
    println!(
        "Started period #{} ({} to {}), income {}",
        period.id,
        period.start_date,
        period.end_date,
        format_currency(income, &params.currency)
    );
    Ok(())
}

fn check(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = date_or_today(sub.get_one::<String>("date"))?;
    let rolled = check_period_end(conn, today)?;
    println!("{}", serde_json::json!({ "new_period": rolled }));
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let periods = all_periods(conn, limit)?;
    if maybe_print_json(sub.get_flag("json"), &periods)? {
        return Ok(());
    }
    let rows = periods
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.start_date.to_string(),
                p.end_date.to_string(),
                p.initial_income.to_string(),
                p.tithing_amount.to_string(),
                p.saving_amount.to_string(),
                if p.is_active { "yes".into() } else { "".into() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Id", "Start", "End", "Income", "Tithing", "Saving", "Active"],
            rows
        )
    );
    Ok(())
}

fn sync(conn: &mut Connection) -> Result<()> {
    let result = synchronize_active_period(conn, None)?;
    if result.synced {
        println!(
            "Synchronized period {} (income {}, spendable {})",
            result.period_id.unwrap_or_default(),
            result.total_income,
            result.spendable
        );
    } else {
        println!("No active period to synchronize.");
    }
    Ok(())
}
