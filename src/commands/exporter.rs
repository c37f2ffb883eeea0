// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::json;

use crate::budgets::period_budgets;
use crate::context::{transactions_for_period, SYSTEM_VERSION};
use crate::errors::StewardError;
use crate::habits::{analyze_spending_habits, recommendations, Habit, Recommendation};
use crate::notify::overlapping_for_period;
use crate::params::parameters_by_version;
use crate::period::{active_period, period_by_id, period_totals};

static TAG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Plain text for export payloads: tags stripped, the few entities the
/// sanitizer produces decoded back.
fn normalize_export_text(value: &str) -> String {
    let stripped = TAG_STRIP_RE.replace_all(value, "");
    stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

#[derive(Debug, Serialize)]
pub struct PeriodExport {
    pub metadata: serde_json::Value,
    pub parameters: serde_json::Value,
    pub budgets: Vec<serde_json::Value>,
    pub transactions: Vec<serde_json::Value>,
    pub notifications: Vec<serde_json::Value>,
    pub summary: PeriodExportSummary,
    pub analysis: PeriodExportAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodExportSummary {
    pub total_income: i64,
    pub main_income: i64,
    pub extra_income: i64,
    pub total_expenses: i64,
    pub total_tithing: i64,
    pub total_saving: i64,
    pub total_budget: i64,
    pub total_spent: i64,
    pub remaining_budget: i64,
    pub saving_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct PeriodExportAnalysis {
    pub habits: Vec<Habit>,
    pub recommendations: Vec<Recommendation>,
}

pub fn build_period_export(
    conn: &mut Connection,
    period_id: i64,
    now: NaiveDateTime,
) -> Result<PeriodExport> {
    let period = period_by_id(conn, period_id)?
        .ok_or_else(|| StewardError::NotFound(format!("Period {}", period_id)))?;
    let parameters = parameters_by_version(conn, period.parameters_version)?;
    let budgets = period_budgets(conn, period_id)?;
    let transactions = transactions_for_period(conn, period_id, false, None)?;
    let notifications = overlapping_for_period(conn, period.start_date, period.end_date)?;
    let totals = period_totals(conn, period_id)?;

    let saving_rate = if totals.total_income > 0 {
        (totals.total_saving as f64 / totals.total_income as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    let habits = analyze_spending_habits(conn, 3)?
        .into_iter()
        .map(|mut h| {
            h.message = normalize_export_text(&h.message);
            h.category = normalize_export_text(&h.category);
            h
        })
        .collect();
    let recs = recommendations(conn)?
        .into_iter()
        .map(|mut r| {
            r.message = normalize_export_text(&r.message);
            r.action = normalize_export_text(&r.action);
            r
        })
        .collect();

    Ok(PeriodExport {
        metadata: json!({
            "export_date": now.format("%Y-%m-%d %H:%M:%S").to_string(),
            "period_id": period_id,
            "period_start": period.start_date,
            "period_end": period.end_date,
            "system_version": SYSTEM_VERSION,
        }),
        parameters: json!({
            "version": parameters.id,
            "default_income": parameters.default_income,
            "currency": parameters.currency,
            "tithing_percent": parameters.tithing_percent,
            "main_saving_percent": parameters.main_saving_percent,
            "extra_saving_percent": parameters.extra_saving_percent,
        }),
        budgets: budgets
            .iter()
            .map(|b| {
                json!({
                    "category": b.name,
                    "allocated": b.allocated_amount,
                    "spent": b.spent_amount,
                    "remaining": b.remaining,
                    "percentage_used": b.percentage_used,
                    "status": b.status,
                })
            })
            .collect(),
        transactions: transactions
            .iter()
            .map(|t| {
                json!({
                    "date": t.date,
                    "type": t.tx_type,
                    "category": t.category_name,
                    "amount": t.amount,
                    "description": normalize_export_text(&t.description),
                    "comment": normalize_export_text(&t.comment),
                    "tithing_paid": t.tithing_paid,
                    "saving_paid": t.saving_paid,
                    "balance_after": t.balance_after,
                })
            })
            .collect(),
        notifications: notifications
            .iter()
            .map(|n| {
                json!({
                    "timeframe": n.timeframe,
                    "range_start": n.range_start,
                    "range_end": n.range_end,
                    "analysis_html": normalize_export_text(&n.analysis_html),
                    "created_at": n.created_at,
                    "is_read": n.is_read,
                })
            })
            .collect(),
        summary: PeriodExportSummary {
            total_income: totals.total_income + totals.total_extra_income,
            main_income: totals.total_income,
            extra_income: totals.total_extra_income,
            total_expenses: totals.total_expenses,
            total_tithing: totals.total_tithing,
            total_saving: totals.total_saving,
            total_budget: totals.total_budget,
            total_spent: totals.total_spent,
            remaining_budget: totals.total_budget - totals.total_spent,
            saving_rate,
        },
        analysis: PeriodExportAnalysis {
            habits,
            recommendations: recs,
        },
    })
}

/// Write one period's export file and record it in the history.
pub fn export_period_to_json(
    conn: &mut Connection,
    period_id: i64,
    now: NaiveDateTime,
    out_dir: &Path,
) -> Result<(PathBuf, PeriodExport)> {
    let export = build_period_export(conn, period_id, now)?;
    let filename = format!("period_{}_{}.json", period_id, now.format("%Y-%m-%d_%H%M%S"));
    let filepath = out_dir.join(filename);
    fs::write(&filepath, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Write export {}", filepath.display()))?;
    conn.execute(
        "INSERT INTO export_history(period_id, export_type, file_path) VALUES (?1, 'period', ?2)",
        params![period_id, filepath.to_string_lossy()],
    )?;
    Ok((filepath, export))
}

#[derive(Debug, Serialize)]
pub struct YearExport {
    pub metadata: serde_json::Value,
    pub periods: Vec<serde_json::Value>,
    pub annual_summary: serde_json::Value,
}

/// Aggregate every period of a year into one file of per-period summaries
/// plus annual totals. Each period's own export file is written along the
/// way.
pub fn export_year_to_json(
    conn: &mut Connection,
    year: i32,
    now: NaiveDateTime,
    out_dir: &Path,
) -> Result<(PathBuf, usize)> {
    let period_ids: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM financial_periods
             WHERE CAST(strftime('%Y', start_date) AS INTEGER)=?1
             ORDER BY start_date",
        )?;
        let rows = stmt.query_map(params![year], |r| r.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };
    if period_ids.is_empty() {
        anyhow::bail!("No periods found for year {}", year);
    }

    let mut periods = Vec::new();
    let mut total_income = 0i64;
    let mut total_expenses = 0i64;
    let mut total_tithing = 0i64;
    let mut total_saving = 0i64;
    let mut saving_rates = Vec::new();

    for period_id in &period_ids {
        let (_, export) = export_period_to_json(conn, *period_id, now, out_dir)?;
        total_income += export.summary.total_income;
        total_expenses += export.summary.total_expenses;
        total_tithing += export.summary.total_tithing;
        total_saving += export.summary.total_saving;
        saving_rates.push(export.summary.saving_rate);
        periods.push(json!({
            "period_id": period_id,
            "start_date": export.metadata["period_start"],
            "end_date": export.metadata["period_end"],
            "summary": export.summary,
        }));
    }

    let average_saving_rate = if saving_rates.is_empty() {
        0.0
    } else {
        saving_rates.iter().sum::<f64>() / saving_rates.len() as f64
    };

    let export = YearExport {
        metadata: json!({
            "export_date": now.format("%Y-%m-%d %H:%M:%S").to_string(),
            "year": year,
            "period_count": period_ids.len(),
            "system_version": SYSTEM_VERSION,
        }),
        periods,
        annual_summary: json!({
            "total_income": total_income,
            "total_expenses": total_expenses,
            "total_tithing": total_tithing,
            "total_saving": total_saving,
            "average_saving_rate": average_saving_rate,
        }),
    };

    let filename = format!("year_{}_{}.json", year, now.format("%Y-%m-%d_%H%M%S"));
    let filepath = out_dir.join(filename);
    fs::write(&filepath, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Write export {}", filepath.display()))?;
    conn.execute(
        "INSERT INTO export_history(period_id, export_type, file_path) VALUES (NULL, 'year', ?1)",
        params![filepath.to_string_lossy()],
    )?;
    Ok((filepath, period_ids.len()))
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("period", sub)) => {
            let period_id = match sub.get_one::<i64>("id") {
                Some(&id) => id,
                None => active_period(conn)?
                    .ok_or(StewardError::NoActivePeriod)?
                    .id,
            };
            let dir = crate::db::exports_dir()?;
            let (path, _) =
                export_period_to_json(conn, period_id, Utc::now().naive_utc(), &dir)?;
            println!("Exported period {} to {}", period_id, path.display());
        }
        Some(("year", sub)) => {
            let year = *sub.get_one::<i32>("year").unwrap();
            let dir = crate::db::exports_dir()?;
            let (path, count) = export_year_to_json(conn, year, Utc::now().naive_utc(), &dir)?;
            println!("Exported {} periods of {} to {}", count, year, path.display());
        }
        Some(("transactions", sub)) => export_transactions(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.date, t.type, c.name, t.amount, t.description, t.comment,
                t.tithing_paid, t.saving_paid, t.balance_after
         FROM transactions t
         LEFT JOIN budget_categories c ON t.category_id=c.id
         ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, i64>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, i64>(7)?,
            r.get::<_, i64>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date",
                "type",
                "category",
                "amount",
                "description",
                "comment",
                "tithing_paid",
                "saving_paid",
                "balance_after",
            ])?;
            for row in rows {
                let (date, tx_type, category, amount, description, comment, tithing, saving, balance) =
                    row?;
                wtr.write_record([
                    date,
                    tx_type,
                    category.unwrap_or_default(),
                    amount.to_string(),
                    description,
                    comment,
                    tithing.to_string(),
                    saving.to_string(),
                    balance.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (date, tx_type, category, amount, description, comment, tithing, saving, balance) =
                    row?;
                items.push(json!({
                    "date": date, "type": tx_type, "category": category, "amount": amount,
                    "description": description, "comment": comment,
                    "tithing_paid": tithing, "saving_paid": saving, "balance_after": balance,
                }));
            }
            fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported transactions to {}", out);
    Ok(())
}
