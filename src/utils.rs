// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Category;

const UA: &str = concat!(
    "steward/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/steward)"
);

pub fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// CLI date option fallback: parse when given, local today otherwise.
pub fn date_or_today(opt: Option<&String>) -> Result<NaiveDate> {
    match opt {
        Some(s) => parse_date(s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("Invalid month {}-{:02}", year, month))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .with_context(|| format!("Invalid month {}-{:02}", year, month))?;
    Ok((start, next - chrono::Duration::days(1)))
}

/// Whole-unit currency with thin-space grouping, e.g. `120 000 FC`.
pub fn format_currency(amount: i64, ccy: &str) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{} {}", grouped, ccy)
    } else {
        format!("{} {}", grouped, ccy)
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(json_flag: bool, v: &T) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    Ok(false)
}

// Key/value tunables

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| r.get(0))
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn setting_i64(conn: &Connection, key: &str, default: i64) -> Result<i64> {
    match get_setting(conn, key)? {
        Some(v) => Ok(v.parse::<i64>().unwrap_or(default)),
        None => Ok(default),
    }
}

// Category catalog

fn category_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        name: r.get(1)?,
        icon: r.get(2)?,
        color: r.get(3)?,
        position: r.get(4)?,
        is_unexpected: r.get::<_, i64>(5)? != 0,
    })
}

pub fn all_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, icon, color, position, is_unexpected
         FROM budget_categories ORDER BY position",
    )?;
    let rows = stmt.query_map([], category_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn category_by_id(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let cat = conn
        .query_row(
            "SELECT id, name, icon, color, position, is_unexpected
             FROM budget_categories WHERE id=?1",
            params![id],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM budget_categories WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0, "FC"), "0 FC");
        assert_eq!(format_currency(950, "FC"), "950 FC");
        assert_eq!(format_currency(120000, "FC"), "120 000 FC");
        assert_eq!(format_currency(-1234567, "FC"), "-1 234 567 FC");
    }

    #[test]
    fn month_bounds_handles_leap_february() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start.to_string(), "2024-02-01");
        assert_eq!(end.to_string(), "2024-02-29");
        let (_, end) = month_bounds(2023, 12).unwrap();
        assert_eq!(end.to_string(), "2023-12-31");
    }
}
