// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use steward::params::{create_parameters, NewParameters};
use steward::period::{check_period_end, create_period, synchronize_active_period};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    steward::db::init_schema(&mut conn).unwrap();
    conn
}

fn version_with_split(conn: &mut Connection, percentages: BTreeMap<i64, i64>) -> i64 {
    create_parameters(
        conn,
        &NewParameters {
            default_income: 120000,
            currency: "FC".into(),
            tithing_percent: 10,
            main_saving_percent: 20,
            extra_saving_percent: 50,
            budget_percentages: percentages,
        },
    )
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn create_period_splits_and_allocates_exactly() {
    let mut conn = setup();
    let version = version_with_split(&mut conn, BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    let period = create_period(&mut conn, 100000, version, date(2024, 1, 1)).unwrap();

    assert_eq!(period.tithing_amount, 10000);
    assert_eq!(period.saving_amount, 20000);
    assert_eq!(period.start_date, date(2024, 1, 1));
    assert_eq!(period.end_date, date(2024, 2, 1));
    assert!(period.is_active);

    let budgets = steward::budgets::period_budgets(&conn, period.id).unwrap();
    let by_cat: BTreeMap<i64, i64> = budgets
        .iter()
        .map(|b| (b.category_id, b.allocated_amount))
        .collect();
    assert_eq!(by_cat[&1], 28000);
    assert_eq!(by_cat[&2], 21000);
    assert_eq!(by_cat[&3], 21000);
    assert_eq!(by_cat.values().sum::<i64>(), 70000);

    // The seed income lands in the ledger with its split recorded.
    let (count, tithing, saving, balance): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), SUM(tithing_paid), SUM(saving_paid), SUM(balance_after)
             FROM transactions WHERE period_id=?1 AND type='income_main'",
            [period.id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(tithing, 10000);
    assert_eq!(saving, 20000);
    assert_eq!(balance, 70000);
}

#[test]
fn create_period_supersedes_the_previous_one() {
    let mut conn = setup();
    let version = version_with_split(&mut conn, BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    let first = create_period(&mut conn, 100000, version, date(2024, 1, 1)).unwrap();
    let second = create_period(&mut conn, 120000, version, date(2024, 2, 1)).unwrap();

    let active: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM financial_periods WHERE is_active=1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(active, 1);
    let first_active: i64 = conn
        .query_row(
            "SELECT is_active FROM financial_periods WHERE id=?1",
            [first.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(first_active, 0);
    assert!(second.is_active);
}

#[test]
fn rollover_fires_once_at_the_boundary() {
    let mut conn = setup();
    let version = version_with_split(&mut conn, BTreeMap::from([(1, 40), (2, 30), (3, 30)]));
    let period = create_period(&mut conn, 100000, version, date(2024, 1, 1)).unwrap();
    conn.execute(
        "UPDATE financial_periods SET end_date='2024-01-31' WHERE id=?1",
        [period.id],
    )
    .unwrap();

    // Day before the end: nothing happens.
    assert!(!check_period_end(&mut conn, date(2024, 1, 30)).unwrap());

    // On the boundary: exactly one new period, the old one superseded.
    assert!(check_period_end(&mut conn, date(2024, 2, 1)).unwrap());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM financial_periods", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
    let old_active: i64 = conn
        .query_row(
            "SELECT is_active FROM financial_periods WHERE id=?1",
            [period.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(old_active, 0);

    // Same day again: the fresh period is current, no second rollover.
    assert!(!check_period_end(&mut conn, date(2024, 2, 1)).unwrap());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM financial_periods", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);

    // The rollover period uses the default income of the parameters.
    let income: i64 = conn
        .query_row(
            "SELECT initial_income FROM financial_periods WHERE is_active=1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(income, 120000);
}

#[test]
fn synchronize_reconciles_budgets_without_losing_spent() {
    let mut conn = setup();
    let v1 = version_with_split(&mut conn, BTreeMap::from([(1, 40), (2, 30), (3, 30)]));
    let period = create_period(&mut conn, 100000, v1, date(2024, 1, 1)).unwrap();

    steward::ledger::record_expense(&mut conn, 1, 5000, "groceries", None, date(2024, 1, 3))
        .unwrap();

    // New split drops category 3 entirely.
    let v2 = version_with_split(&mut conn, BTreeMap::from([(1, 50), (2, 50)]));
    let result = synchronize_active_period(&mut conn, Some(v2)).unwrap();
    assert!(result.synced);
    assert_eq!(result.total_income, 100000);
    assert_eq!(result.spendable, 70000);

    let budgets = steward::budgets::period_budgets(&conn, period.id).unwrap();
    let by_cat: BTreeMap<i64, (i64, i64)> = budgets
        .iter()
        .map(|b| (b.category_id, (b.allocated_amount, b.spent_amount)))
        .collect();
    assert_eq!(by_cat[&1], (35000, 5000));
    assert_eq!(by_cat[&2], (35000, 0));
    // Dropped category is zeroed, never deleted.
    assert_eq!(by_cat[&3], (0, 0));

    let version_now: i64 = conn
        .query_row(
            "SELECT parameters_version FROM financial_periods WHERE id=?1",
            [period.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(version_now, v2);
}

#[test]
fn synchronize_without_active_period_is_a_noop() {
    let mut conn = setup();
    let result = synchronize_active_period(&mut conn, None).unwrap();
    assert!(!result.synced);
}
