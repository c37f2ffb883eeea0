// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::errors::StewardError;
use crate::ledger::{record_expense, record_extra_income, record_main_income};
use crate::params::current_parameters;
use crate::utils::{date_or_today, format_currency, id_for_category, maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expense", sub)) => expense(conn, sub)?,
        Some(("income", sub)) => income(conn, sub)?,
        Some(("extra", sub)) => extra(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn expense(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let category = sub.get_one::<String>("category").unwrap();
    let amount = *sub.get_one::<i64>("amount").unwrap();
    let description = sub.get_one::<String>("description").unwrap();
    let comment = sub.get_one::<String>("comment").map(String::as_str);
    let date = date_or_today(sub.get_one::<String>("date"))?;

    let category_id = id_for_category(conn, category)?;
    let currency = current_parameters(conn)?.currency;

    match record_expense(conn, category_id, amount, description, comment, date) {
        Ok(id) => {
            println!(
                "Recorded expense #{}: {} on '{}' ({})",
                id,
                format_currency(amount, &currency),
                category,
                description
            );
        }
        Err(e) => match e.downcast_ref::<StewardError>() {
            Some(StewardError::OverBudget { available }) => {
                anyhow::bail!(
                    "Over budget: only {} available for {}",
                    format_currency(*available, &currency),
                    category
                );
            }
            _ => return Err(e),
        },
    }
    Ok(())
}

fn income(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = *sub.get_one::<i64>("amount").unwrap();
    let description = sub.get_one::<String>("description").unwrap();
    let date = date_or_today(sub.get_one::<String>("date"))?;
    let currency = current_parameters(conn)?.currency;

    let id = record_main_income(conn, amount, description, date)?;
    println!(
        "Recorded main income #{}: {}",
        id,
        format_currency(amount, &currency)
    );
    Ok(())
}

fn extra(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = *sub.get_one::<i64>("amount").unwrap();
    let description = sub.get_one::<String>("description").unwrap();
    let date = date_or_today(sub.get_one::<String>("date"))?;
    let currency = current_parameters(conn)?.currency;

    let id = record_extra_income(conn, amount, description, date)?;
    println!(
        "Recorded extra income #{}: {}",
        id,
        format_currency(amount, &currency)
    );
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub category: String,
    pub amount: i64,
    pub description: String,
    pub comment: String,
    pub balance_after: i64,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.type, c.name, t.amount, t.description, t.comment, t.balance_after
         FROM transactions t
         LEFT JOIN budget_categories c ON t.category_id=c.id WHERE 1=1",
    );
    let mut args: Vec<String> = Vec::new();

    if let Some(tx_type) = sub.get_one::<String>("type") {
        sql.push_str(" AND t.type=?");
        args.push(tx_type.clone());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<i64>("limit") {
        sql.push_str(" LIMIT ?");
        args.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let arg_refs: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(arg_refs))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get::<_, String>(1)?,
            tx_type: r.get(2)?,
            category: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
            amount: r.get(4)?,
            description: r.get(5)?,
            comment: r.get::<_, Option<String>>(6)?.unwrap_or_default(),
            balance_after: r.get(7)?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.tx_type.clone(),
                    r.category.clone(),
                    r.amount.to_string(),
                    r.description.clone(),
                    r.balance_after.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Type", "Category", "Amount", "Description", "Balance"],
                rows
            )
        );
    }
    Ok(())
}
