// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::params::{
    budget_percentages, create_parameters, current_parameters, parameters_history, NewParameters,
};
use crate::period::synchronize_active_period;
use crate::utils::{category_by_id, id_for_category, maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub)?,
        Some(("set", sub)) => set(conn, sub)?,
        Some(("history", sub)) => history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn show(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let params = current_parameters(conn)?;
    let percentages = budget_percentages(conn, params.id)?;
    if maybe_print_json(
        sub.get_flag("json"),
        &serde_json::json!({ "parameters": params, "budget_percentages": percentages }),
    )? {
        return Ok(());
    }

    let mut rows = vec![
        vec!["Version".into(), params.id.to_string()],
        vec!["Default income".into(), params.default_income.to_string()],
        vec!["Currency".into(), params.currency.clone()],
        vec!["Tithing %".into(), params.tithing_percent.to_string()],
        vec!["Main saving %".into(), params.main_saving_percent.to_string()],
        vec!["Extra saving %".into(), params.extra_saving_percent.to_string()],
    ];
    for (category_id, pct) in &percentages {
        let name = category_by_id(conn, *category_id)?
            .map(|c| c.name)
            .unwrap_or_else(|| format!("category {}", category_id));
        rows.push(vec![format!("Budget % - {}", name), pct.to_string()]);
    }
    println!("{}", pretty_table(&["Setting", "Value"], rows));
    Ok(())
}

/// Create a new parameter version, then bring the running period in line
/// with it.
fn set(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let income = *sub.get_one::<i64>("income").unwrap();
    let tithing = *sub.get_one::<i64>("tithing").unwrap();
    let main_saving = *sub.get_one::<i64>("main-saving").unwrap();
    let extra_saving = *sub.get_one::<i64>("extra-saving").unwrap();
    let currency = match sub.get_one::<String>("currency") {
        Some(c) => c.clone(),
        None => current_parameters(conn)?.currency,
    };

    let mut percentages = BTreeMap::new();
    for entry in sub.get_many::<String>("percent").unwrap() {
        let (name, pct) = entry
            .split_once('=')
            .with_context(|| format!("Invalid --percent '{}', expected NAME=PCT", entry))?;
        let pct: i64 = pct
            .trim()
            .parse()
            .with_context(|| format!("Invalid percentage in '{}'", entry))?;
        percentages.insert(id_for_category(conn, name.trim())?, pct);
    }

    let version = create_parameters(
        conn,
        &NewParameters {
            default_income: income,
            currency,
            tithing_percent: tithing,
            main_saving_percent: main_saving,
            extra_saving_percent: extra_saving,
            budget_percentages: percentages,
        },
    )?;
    println!("Created parameter version {}", version);

    let sync = synchronize_active_period(conn, Some(version))?;
    if sync.synced {
        println!(
            "Active period resynced (income {}, spendable {})",
            sync.total_income, sync.spendable
        );
    }
    Ok(())
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let rows = parameters_history(conn, limit)?
        .into_iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.default_income.to_string(),
                p.currency,
                p.tithing_percent.to_string(),
                p.main_saving_percent.to_string(),
                p.extra_saving_percent.to_string(),
                if p.is_active { "yes".into() } else { "".into() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Version", "Income", "CCY", "Tithe %", "Save %", "Extra %", "Active"],
            rows
        )
    );
    Ok(())
}
