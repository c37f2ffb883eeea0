// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use steward::errors::StewardError;
use steward::ledger::{record_expense, record_extra_income, record_main_income};
use steward::params::{create_parameters, NewParameters};
use steward::period::create_period;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fresh database with one active period: income 100000, tithing 10%,
/// saving 20%, split 40/30/30 over categories 1..3 => budgets
/// 28000/21000/21000.
fn setup(percentages: BTreeMap<i64, i64>) -> (Connection, i64) {
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
            budget_percentages: percentages,
        },
    )
    .unwrap();
    let period = create_period(&mut conn, 100000, version, date(2024, 1, 1)).unwrap();
    (conn, period.id)
}

fn spent(conn: &Connection, period_id: i64, category_id: i64) -> i64 {
    conn.query_row(
        "SELECT spent_amount FROM period_budgets WHERE period_id=?1 AND category_id=?2",
        [period_id, category_id],
        |r| r.get(0),
    )
    .unwrap()
}

fn expense_count(conn: &Connection, period_id: i64, category_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions
         WHERE period_id=?1 AND category_id=?2 AND type='expense'",
        [period_id, category_id],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn expense_exactly_remaining_succeeds_one_more_fails() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    // Category 2 holds 21000; spending all of it is allowed.
    record_expense(&mut conn, 2, 21000, "rent", None, date(2024, 1, 5)).unwrap();
    assert_eq!(spent(&conn, period_id, 2), 21000);

    // One more unit is rejected with the available amount, and nothing is
    // written.
    let err = record_expense(&mut conn, 2, 1, "coffee", None, date(2024, 1, 6)).unwrap_err();
    match err.downcast_ref::<StewardError>() {
        Some(StewardError::OverBudget { available }) => assert_eq!(*available, 0),
        other => panic!("expected OverBudget, got {:?}", other),
    }
    assert_eq!(spent(&conn, period_id, 2), 21000);
    assert_eq!(expense_count(&conn, period_id, 2), 1);
}

#[test]
fn over_budget_mutates_nothing() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    let err = record_expense(&mut conn, 1, 28001, "splurge", None, date(2024, 1, 2)).unwrap_err();
    match err.downcast_ref::<StewardError>() {
        Some(StewardError::OverBudget { available }) => assert_eq!(*available, 28000),
        other => panic!("expected OverBudget, got {:?}", other),
    }
    assert_eq!(spent(&conn, period_id, 1), 0);
    assert_eq!(expense_count(&conn, period_id, 1), 0);
}

#[test]
fn unexpected_category_requires_a_comment() {
    // Category 5 (Contingency) is flagged is_unexpected by the seed data.
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (5, 30)]));

    let err = record_expense(&mut conn, 5, 1000, "repair", None, date(2024, 1, 4)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StewardError>(),
        Some(StewardError::Validation(_))
    ));
    assert_eq!(spent(&conn, period_id, 5), 0);

    // A blank comment does not count.
    let err =
        record_expense(&mut conn, 5, 1000, "repair", Some("  "), date(2024, 1, 4)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StewardError>(),
        Some(StewardError::Validation(_))
    ));

    record_expense(&mut conn, 5, 1000, "repair", Some("flat tire"), date(2024, 1, 4)).unwrap();
    assert_eq!(spent(&conn, period_id, 5), 1000);
}

#[test]
fn spent_amount_tracks_the_ledger() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    for amount in [1200, 340, 55] {
        record_expense(&mut conn, 1, amount, "food", None, date(2024, 1, 10)).unwrap();
    }
    let ledger_sum: i64 = conn
        .query_row(
            "SELECT SUM(amount) FROM transactions
             WHERE period_id=?1 AND category_id=1 AND type='expense'",
            [period_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(ledger_sum, 1595);
    assert_eq!(spent(&conn, period_id, 1), 1595);
}

#[test]
fn threshold_alerts_repeat_on_every_check() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    // 21100/28000 = 75.4% crosses the warning band.
    record_expense(&mut conn, 1, 21100, "stock up", None, date(2024, 1, 5)).unwrap();
    // Still inside the warning band: a second identical alert is inserted.
    // The analyzer intentionally does not de-duplicate.
    record_expense(&mut conn, 1, 100, "more", None, date(2024, 1, 6)).unwrap();

    let warnings: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM alerts
             WHERE period_id=?1 AND type='threshold' AND level='warning'",
            [period_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(warnings, 2);
}

#[test]
fn exhausted_budget_raises_a_danger_alert() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    record_expense(&mut conn, 3, 21000, "all of it", None, date(2024, 1, 5)).unwrap();
    let dangers: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM alerts
             WHERE period_id=?1 AND type='threshold' AND level='danger'",
            [period_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(dangers, 1);
}

#[test]
fn main_income_grows_budgets_by_percentage() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    record_main_income(&mut conn, 10000, "bonus salary", date(2024, 1, 15)).unwrap();

    // Split: 1000 tithing, 2000 saving, 7000 spendable => +2800/+2100/+2100.
    let (tithing, saving): (i64, i64) = conn
        .query_row(
            "SELECT tithing_amount, saving_amount FROM financial_periods WHERE id=?1",
            [period_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(tithing, 11000);
    assert_eq!(saving, 22000);

    let budgets = steward::budgets::period_budgets(&conn, period_id).unwrap();
    let by_cat: BTreeMap<i64, i64> = budgets
        .iter()
        .map(|b| (b.category_id, b.allocated_amount))
        .collect();
    assert_eq!(by_cat[&1], 30800);
    assert_eq!(by_cat[&2], 23100);
    assert_eq!(by_cat[&3], 23100);
}

#[test]
fn extra_income_distributes_proportionally_and_defers_tithing() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    // Extra split: 1000 tithing, 5000 saving (50%), 4000 spendable.
    // Shares over 28000/21000/21000 of 70000: +1600/+1200/+1200.
    record_extra_income(&mut conn, 10000, "side job", date(2024, 1, 20)).unwrap();

    let budgets = steward::budgets::period_budgets(&conn, period_id).unwrap();
    let by_cat: BTreeMap<i64, i64> = budgets
        .iter()
        .map(|b| (b.category_id, b.allocated_amount))
        .collect();
    assert_eq!(by_cat[&1], 29600);
    assert_eq!(by_cat[&2], 22200);
    assert_eq!(by_cat[&3], 22200);

    let (deferred, paid): (i64, i64) = conn
        .query_row(
            "SELECT amount, is_paid FROM deferred_tithing WHERE source_period_id=?1",
            [period_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(deferred, 1000);
    assert_eq!(paid, 0);

    // The period's own cumulative totals are not touched by extra income.
    let (tithing, saving): (i64, i64) = conn
        .query_row(
            "SELECT tithing_amount, saving_amount FROM financial_periods WHERE id=?1",
            [period_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(tithing, 10000);
    assert_eq!(saving, 20000);
}

#[test]
fn expense_without_active_period_fails() {
    let mut conn = Connection::open_in_memory().unwrap();
    steward::db::init_schema(&mut conn).unwrap();
    let err = record_expense(&mut conn, 1, 100, "food", None, date(2024, 1, 1)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StewardError>(),
        Some(StewardError::NoActivePeriod)
    ));
}
