// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use steward::habits::analyze_spending_habits;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    steward::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO parameters
         (default_income, currency, tithing_percent, main_saving_percent, extra_saving_percent, is_active)
         VALUES (120000, 'FC', 10, 20, 50, 1)",
        [],
    )
    .unwrap();
    conn
}

/// Insert an inactive historical period with one budget row and one summed
/// expense for category 1.
fn seed_period(conn: &Connection, start: &str, end: &str, allocated: i64, spent: i64) -> i64 {
    conn.execute(
        "INSERT INTO financial_periods
         (start_date, end_date, parameters_version, initial_income, tithing_amount, saving_amount, is_active)
         VALUES (?1, ?2, 1, 100000, 10000, 20000, 0)",
        params![start, end],
    )
    .unwrap();
    let period_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO period_budgets(period_id, category_id, allocated_amount, spent_amount)
         VALUES (?1, 1, ?2, ?3)",
        params![period_id, allocated, spent],
    )
    .unwrap();
    if spent > 0 {
        conn.execute(
            "INSERT INTO transactions
             (period_id, type, category_id, amount, description, comment, date, balance_after)
             VALUES (?1, 'expense', 1, ?2, 'food', '', ?3, 0)",
            params![period_id, spent, start],
        )
        .unwrap();
    }
    period_id
}

#[test]
fn needs_at_least_two_periods() {
    let conn = setup();
    seed_period(&conn, "2024-01-01", "2024-02-01", 10000, 12000);
    assert!(analyze_spending_habits(&conn, 3).unwrap().is_empty());
}

#[test]
fn repeated_overrun_is_flagged_as_persistent() {
    let conn = setup();
    seed_period(&conn, "2024-01-01", "2024-02-01", 10000, 12000);
    seed_period(&conn, "2024-02-01", "2024-03-01", 10000, 11000);
    seed_period(&conn, "2024-03-01", "2024-04-01", 10000, 9000);

    let habits = analyze_spending_habits(&conn, 3).unwrap();
    let persistent: Vec<_> = habits
        .iter()
        .filter(|h| h.kind == "persistent_over")
        .collect();
    assert_eq!(persistent.len(), 1);
    assert_eq!(persistent[0].category, "Food");
    assert_eq!(persistent[0].periods, Some(2));
}

#[test]
fn one_overrun_is_not_a_habit() {
    let conn = setup();
    seed_period(&conn, "2024-01-01", "2024-02-01", 10000, 12000);
    seed_period(&conn, "2024-02-01", "2024-03-01", 10000, 5000);
    seed_period(&conn, "2024-03-01", "2024-04-01", 10000, 5000);

    let habits = analyze_spending_habits(&conn, 3).unwrap();
    assert!(habits.iter().all(|h| h.kind != "persistent_over"));
}

#[test]
fn rising_spending_is_flagged_as_a_trend() {
    let conn = setup();
    // Chronologically 4000 -> 5000 -> 7000: clearly rising.
    seed_period(&conn, "2024-01-01", "2024-02-01", 10000, 4000);
    seed_period(&conn, "2024-02-01", "2024-03-01", 10000, 5000);
    seed_period(&conn, "2024-03-01", "2024-04-01", 10000, 7000);

    let habits = analyze_spending_habits(&conn, 3).unwrap();
    let trends: Vec<_> = habits
        .iter()
        .filter(|h| h.kind == "increasing_trend")
        .collect();
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].category, "Food");
    assert!(trends[0].trend.unwrap() > 10);
}

#[test]
fn flat_spending_is_not_a_trend() {
    let conn = setup();
    seed_period(&conn, "2024-01-01", "2024-02-01", 10000, 5000);
    seed_period(&conn, "2024-02-01", "2024-03-01", 10000, 5000);
    seed_period(&conn, "2024-03-01", "2024-04-01", 10000, 5000);

    let habits = analyze_spending_habits(&conn, 3).unwrap();
    assert!(habits.iter().all(|h| h.kind != "increasing_trend"));
}
