// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Versioned parameter store. A settings change never mutates an existing
//! version; it inserts a new active row and deactivates the old one.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Parameters;

pub const DEFAULT_INCOME: i64 = 120000;
pub const DEFAULT_CURRENCY: &str = "FC";
pub const DEFAULT_TITHING_PERCENT: i64 = 10;
pub const DEFAULT_MAIN_SAVING_PERCENT: i64 = 20;
pub const DEFAULT_EXTRA_SAVING_PERCENT: i64 = 50;

/// Stock category split, applied to the catalog in position order on first
/// run.
const DEFAULT_CATEGORY_PERCENTS: [i64; 5] = [40, 20, 10, 10, 20];

#[derive(Debug, Clone)]
pub struct NewParameters {
    pub default_income: i64,
    pub currency: String,
    pub tithing_percent: i64,
    pub main_saving_percent: i64,
    pub extra_saving_percent: i64,
    pub budget_percentages: BTreeMap<i64, i64>,
}

fn parameters_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Parameters> {
    Ok(Parameters {
        id: r.get(0)?,
        default_income: r.get(1)?,
        currency: r.get(2)?,
        tithing_percent: r.get(3)?,
        main_saving_percent: r.get(4)?,
        extra_saving_percent: r.get(5)?,
        is_active: r.get::<_, i64>(6)? != 0,
    })
}

const PARAMS_COLS: &str = "id, default_income, currency, tithing_percent, \
                           main_saving_percent, extra_saving_percent, is_active";

/// The active parameter version. Creates the stock defaults on first use.
pub fn current_parameters(conn: &mut Connection) -> Result<Parameters> {
    let row = conn
        .query_row(
            &format!("SELECT {PARAMS_COLS} FROM parameters WHERE is_active=1 LIMIT 1"),
            [],
            parameters_from_row,
        )
        .optional()?;
    if let Some(p) = row {
        return Ok(p);
    }
    let defaults = default_parameters(conn)?;
    let version = create_parameters(conn, &defaults)?;
    parameters_by_version(conn, version)
}

/// A specific version, falling back to the active one when absent.
pub fn parameters_by_version(conn: &mut Connection, version: i64) -> Result<Parameters> {
    let row = conn
        .query_row(
            &format!("SELECT {PARAMS_COLS} FROM parameters WHERE id=?1"),
            params![version],
            parameters_from_row,
        )
        .optional()?;
    match row {
        Some(p) => Ok(p),
        None => current_parameters(conn),
    }
}

pub fn parameters_history(conn: &Connection, limit: i64) -> Result<Vec<Parameters>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARAMS_COLS} FROM parameters ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], parameters_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn validate_percentages(percentages: &BTreeMap<i64, i64>) -> bool {
    percentages.values().sum::<i64>() == 100
}

/// Insert a new parameter version with its category percentage table.
/// Deactivation of the old version and both inserts are one transaction.
pub fn create_parameters(conn: &mut Connection, data: &NewParameters) -> Result<i64> {
    if !validate_percentages(&data.budget_percentages) {
        anyhow::bail!(
            "Budget percentages must sum to 100 (got {})",
            data.budget_percentages.values().sum::<i64>()
        );
    }

    let tx = conn.transaction()?;
    tx.execute("UPDATE parameters SET is_active=0 WHERE is_active=1", [])?;
    tx.execute(
        "INSERT INTO parameters
         (default_income, currency, tithing_percent, main_saving_percent, extra_saving_percent, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![
            data.default_income,
            data.currency,
            data.tithing_percent,
            data.main_saving_percent,
            data.extra_saving_percent
        ],
    )?;
    let version = tx.last_insert_rowid();
    for (&category_id, &percentage) in &data.budget_percentages {
        tx.execute(
            "INSERT INTO budget_percentages(parameters_version, category_id, percentage)
             VALUES (?1, ?2, ?3)",
            params![version, category_id, percentage],
        )?;
    }
    tx.commit()?;
    Ok(version)
}

/// Percentage table for a version, seeded from the stock split when the
/// version has none yet.
pub fn budget_percentages(conn: &Connection, version: i64) -> Result<BTreeMap<i64, i64>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, percentage FROM budget_percentages
         WHERE parameters_version=?1 ORDER BY category_id",
    )?;
    let rows = stmt.query_map(params![version], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?))
    })?;
    let mut out = BTreeMap::new();
    for row in rows {
        let (cat, pct) = row?;
        out.insert(cat, pct);
    }
    if !out.is_empty() {
        return Ok(out);
    }

    let defaults = default_category_percentages(conn)?;
    for (&category_id, &percentage) in &defaults {
        conn.execute(
            "INSERT OR IGNORE INTO budget_percentages(parameters_version, category_id, percentage)
             VALUES (?1, ?2, ?3)",
            params![version, category_id, percentage],
        )?;
    }
    Ok(defaults)
}

fn default_parameters(conn: &Connection) -> Result<NewParameters> {
    Ok(NewParameters {
        default_income: DEFAULT_INCOME,
        currency: DEFAULT_CURRENCY.to_string(),
        tithing_percent: DEFAULT_TITHING_PERCENT,
        main_saving_percent: DEFAULT_MAIN_SAVING_PERCENT,
        extra_saving_percent: DEFAULT_EXTRA_SAVING_PERCENT,
        budget_percentages: default_category_percentages(conn)?,
    })
}

fn default_category_percentages(conn: &Connection) -> Result<BTreeMap<i64, i64>> {
    let categories = crate::utils::all_categories(conn).context("Load category catalog")?;
    let mut out = BTreeMap::new();
    for (cat, pct) in categories.iter().zip(DEFAULT_CATEGORY_PERCENTS.iter()) {
        out.insert(cat.id, *pct);
    }
    Ok(out)
}
