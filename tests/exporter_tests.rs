// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use steward::commands::exporter::{export_period_to_json, export_year_to_json};
use steward::ledger::record_expense;
use steward::params::{create_parameters, NewParameters};
use steward::period::create_period;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn now() -> NaiveDateTime {
    date(2024, 4, 2).and_hms_opt(8, 30, 0).unwrap()
}

fn setup_with_period() -> (Connection, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    steward::db::init_schema(&mut conn).unwrap();
    let version = create_parameters(
        &mut conn,
        &NewParameters {
            default_income: 120000,
            currency: "FC".into(),
            tithing_percent: 10,
            main_saving_percent: 20,
            extra_saving_percent: 50,
            budget_percentages: BTreeMap::from([(1, 40), (2, 30), (3, 30)]),
        },
    )
    .unwrap();
    let period = create_period(&mut conn, 100000, version, date(2024, 1, 1)).unwrap();
    record_expense(&mut conn, 1, 4500, "groceries", None, date(2024, 1, 10)).unwrap();
    (conn, period.id)
}

#[test]
fn period_export_writes_the_full_document() {
    let (mut conn, period_id) = setup_with_period();
    let dir = tempfile::tempdir().unwrap();

    let (path, _) = export_period_to_json(&mut conn, period_id, now(), dir.path()).unwrap();
    assert!(path.exists());

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["metadata"]["period_id"], period_id);
    assert_eq!(body["metadata"]["period_start"], "2024-01-01");
    assert_eq!(body["parameters"]["tithing_percent"], 10);
    assert_eq!(body["budgets"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["total_budget"], 70000);
    assert_eq!(body["summary"]["total_spent"], 4500);
    assert_eq!(body["summary"]["remaining_budget"], 65500);
    assert_eq!(body["summary"]["main_income"], 100000);
    assert_eq!(body["summary"]["saving_rate"], 20.0);
    // Seed income + one expense.
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

    let history: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM export_history WHERE export_type='period'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(history, 1);
}

#[test]
fn missing_period_is_an_error() {
    let (mut conn, _) = setup_with_period();
    let dir = tempfile::tempdir().unwrap();
    assert!(export_period_to_json(&mut conn, 999, now(), dir.path()).is_err());
}

#[test]
fn year_export_aggregates_period_summaries() {
    let (mut conn, _) = setup_with_period();
    // A second period in the same year.
    let version: i64 = conn
        .query_row("SELECT id FROM parameters WHERE is_active=1", [], |r| r.get(0))
        .unwrap();
    create_period(&mut conn, 100000, version, date(2024, 2, 1)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let (path, count) = export_year_to_json(&mut conn, 2024, now(), dir.path()).unwrap();
    assert_eq!(count, 2);

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["metadata"]["year"], 2024);
    assert_eq!(body["metadata"]["period_count"], 2);
    assert_eq!(body["periods"].as_array().unwrap().len(), 2);
    assert_eq!(body["annual_summary"]["total_income"], 200000);
    assert_eq!(body["annual_summary"]["total_tithing"], 20000);
    assert_eq!(body["annual_summary"]["total_saving"], 40000);
    assert_eq!(body["annual_summary"]["average_saving_rate"], 20.0);

    // One history row per period file plus one for the year file.
    let history: i64 = conn
        .query_row("SELECT COUNT(*) FROM export_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(history, 3);
}

#[test]
fn year_export_without_periods_fails() {
    let (mut conn, _) = setup_with_period();
    let dir = tempfile::tempdir().unwrap();
    assert!(export_year_to_json(&mut conn, 2019, now(), dir.path()).is_err());
}
