// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use steward::alerts::{SETTING_COMMUNICATION_CATEGORY, SETTING_HOUSEHOLD_CATEGORY};
use steward::ledger::record_expense;
use steward::params::{create_parameters, NewParameters};
use steward::period::create_period;
use steward::utils::set_setting;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

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

fn habit_alerts(conn: &Connection, period_id: i64) -> Vec<(String, String)> {
    let mut stmt = conn
        .prepare("SELECT level, message FROM alerts WHERE period_id=?1 AND type='habit'")
        .unwrap();
    let rows = stmt
        .query_map([period_id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .unwrap();
    rows.map(|r| r.unwrap()).collect()
}

#[test]
fn household_ahead_of_communication_is_flagged_when_configured() {
    // Categories 3 (Communication) and 4 (Household) both carry budgets.
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (3, 30), (4, 30)]));
    set_setting(&conn, SETTING_HOUSEHOLD_CATEGORY, "4").unwrap();
    set_setting(&conn, SETTING_COMMUNICATION_CATEGORY, "3").unwrap();

    // 10500/21000 = 50% household vs 0% communication.
    record_expense(&mut conn, 4, 10500, "cleaning supplies", None, date(2024, 1, 10)).unwrap();

    let habits = habit_alerts(&conn, period_id);
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].0, "warning");
    assert!(habits[0].1.contains("Household"));
    assert!(habits[0].1.contains("Communication"));
}

#[test]
fn household_check_is_silent_without_configuration() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (3, 30), (4, 30)]));
    record_expense(&mut conn, 4, 10500, "cleaning supplies", None, date(2024, 1, 10)).unwrap();
    assert!(habit_alerts(&conn, period_id).is_empty());
}

#[test]
fn early_contingency_usage_is_flagged() {
    // Category 5 (Contingency) is the is_unexpected bucket: 21000 budget.
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (5, 30)]));

    // 11000/21000 = 52% used while ~13% of the period has elapsed.
    record_expense(
        &mut conn,
        5,
        11000,
        "phone repair",
        Some("screen broke"),
        date(2024, 1, 5),
    )
    .unwrap();

    let habits = habit_alerts(&conn, period_id);
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].0, "danger");
    assert!(habits[0].1.contains("Contingency"));
}

#[test]
fn large_expense_in_the_first_days_is_flagged() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    record_expense(&mut conn, 1, 15000, "bulk groceries", None, date(2024, 1, 2)).unwrap();

    let habits = habit_alerts(&conn, period_id);
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].0, "warning");
    assert!(habits[0].1.contains("Large expense"));

    // The same amount later in the period is unremarkable.
    record_expense(&mut conn, 1, 12000, "more groceries", None, date(2024, 1, 20)).unwrap();
    assert_eq!(habit_alerts(&conn, period_id).len(), 1);
}

#[test]
fn threshold_levels_follow_the_bands() {
    let (mut conn, period_id) = setup(BTreeMap::from([(1, 40), (2, 30), (3, 30)]));

    // 19200/21000 = 91.4%: critical band, danger level.
    record_expense(&mut conn, 2, 19200, "rent", None, date(2024, 1, 10)).unwrap();
    let (level, message): (String, String) = conn
        .query_row(
            "SELECT level, message FROM alerts
             WHERE period_id=?1 AND type='threshold' ORDER BY id DESC LIMIT 1",
            [period_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(level, "danger");
    assert!(message.contains("critical"));

    // Filling the budget to 100% escalates to the exhausted message.
    record_expense(&mut conn, 2, 1800, "fees", None, date(2024, 1, 11)).unwrap();
    let message: String = conn
        .query_row(
            "SELECT message FROM alerts
             WHERE period_id=?1 AND type='threshold' ORDER BY id DESC LIMIT 1",
            [period_id],
            |r| r.get(0),
        )
        .unwrap();
    assert!(message.contains("BUDGET EXHAUSTED"));
}
