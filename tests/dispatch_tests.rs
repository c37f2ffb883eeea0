// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde_json::Value;
use steward::dispatch::{parse_data_request, respond, DataRequest};
use steward::params::{create_parameters, NewParameters};
use steward::period::create_period;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    steward::db::init_schema(&mut conn).unwrap();
    conn
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn now() -> NaiveDateTime {
    date(2024, 3, 10).and_hms_opt(12, 0, 0).unwrap()
}

#[test]
fn parses_json_payload() {
    let text = "Let me check.\n[[DATA_REQUEST {\"type\":\"month\",\"month\":\"2024-02\"}]]";
    let pairs = parse_data_request(text).unwrap();
    assert_eq!(pairs["type"], Value::String("month".into()));
    assert_eq!(pairs["month"], Value::String("2024-02".into()));
}

#[test]
fn parses_key_value_payload_with_quotes() {
    let text = "[[DATA_REQUEST type=range start=\"2024-01-01\" end='2024-01-31']]";
    let pairs = parse_data_request(text).unwrap();
    assert_eq!(pairs["type"], Value::String("range".into()));
    assert_eq!(pairs["start"], Value::String("2024-01-01".into()));
    assert_eq!(pairs["end"], Value::String("2024-01-31".into()));
}

#[test]
fn type_key_is_case_insensitive() {
    let pairs = parse_data_request("[[DATA_REQUEST {\"Type\":\"year\",\"Year\":2024}]]").unwrap();
    assert_eq!(pairs["type"], Value::String("year".into()));
    let request = DataRequest::resolve(&pairs, date(2024, 3, 10)).unwrap();
    assert_eq!(request, DataRequest::Year { year: 2024 });
}

#[test]
fn no_directive_or_missing_type_yields_none() {
    assert!(parse_data_request("Just a normal answer.").is_none());
    assert!(parse_data_request("[[DATA_REQUEST period_id=3]]").is_none());
    assert!(parse_data_request("[[DATA_REQUEST   ]]").is_none());
}

#[test]
fn only_the_first_directive_counts() {
    let text = "[[DATA_REQUEST type=year year=2024]] and [[DATA_REQUEST type=year year=2023]]";
    let pairs = parse_data_request(text).unwrap();
    assert_eq!(pairs["year"], Value::String("2024".into()));
}

#[test]
fn month_resolves_leap_february() {
    let mut conn = setup();
    let pairs = parse_data_request("[[DATA_REQUEST {\"type\":\"month\",\"month\":\"2024-02\"}]]")
        .unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert!(envelope.error.is_none());
    let data = envelope.data.unwrap();
    assert_eq!(data["metadata"]["range_start"], "2024-02-01");
    assert_eq!(data["metadata"]["range_end"], "2024-02-29");
}

#[test]
fn month_thirteen_is_a_validation_error_not_a_crash() {
    let mut conn = setup();
    let pairs =
        parse_data_request("[[DATA_REQUEST {\"type\":\"month\",\"year\":2023,\"month\":13}]]")
            .unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert!(envelope.error.unwrap().contains("Invalid month"));
    assert!(envelope.data.is_none());
}

#[test]
fn unknown_type_is_reported_as_unsupported() {
    let mut conn = setup();
    let pairs = parse_data_request("[[DATA_REQUEST type=weather city=Kinshasa]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert_eq!(
        envelope.error.unwrap(),
        "Unsupported request type 'weather'"
    );
}

#[test]
fn range_rejects_inverted_bounds_and_bad_dates() {
    let mut conn = setup();
    let pairs =
        parse_data_request("[[DATA_REQUEST type=range start=2024-02-01 end=2024-01-01]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert_eq!(envelope.error.unwrap(), "start_date must be <= end_date");

    let pairs =
        parse_data_request("[[DATA_REQUEST type=range start=02/01/2024 end=2024-03-01]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert!(envelope.error.unwrap().contains("Invalid dates"));
}

#[test]
fn last_days_defaults_and_clamps() {
    let today = date(2024, 3, 10);
    let pairs = parse_data_request("[[DATA_REQUEST type=last_days]]").unwrap();
    let request = DataRequest::resolve(&pairs, today).unwrap();
    assert_eq!(request, DataRequest::LastDays { days: 30, end: today });

    let pairs = parse_data_request("[[DATA_REQUEST type=last_days days=9999]]").unwrap();
    let request = DataRequest::resolve(&pairs, today).unwrap();
    assert_eq!(request, DataRequest::LastDays { days: 365, end: today });
}

#[test]
fn period_lookup_errors_inside_the_envelope() {
    let mut conn = setup();
    let pairs = parse_data_request("[[DATA_REQUEST type=period period_id=42]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert_eq!(envelope.error.unwrap(), "Period not found");

    let pairs = parse_data_request("[[DATA_REQUEST type=period period_id=0]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert_eq!(envelope.error.unwrap(), "Invalid period_id");
}

#[test]
fn current_period_returns_the_full_context() {
    let mut conn = setup();
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
    let period = create_period(&mut conn, 100000, version, date(2024, 3, 1)).unwrap();

    let pairs = parse_data_request("[[DATA_REQUEST type=current]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert!(envelope.error.is_none());
    let data = envelope.data.unwrap();
    assert_eq!(data["period"]["id"], period.id);
    assert_eq!(data["summary"]["total_budget"], 70000);
    assert_eq!(envelope.tool, "DATA_REQUEST");
    assert_eq!(envelope.requested_at, "2024-03-10 12:00:00");
}

#[test]
fn period_by_date_finds_the_covering_period() {
    let mut conn = setup();
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
    let period = create_period(&mut conn, 100000, version, date(2024, 3, 1)).unwrap();

    let pairs = parse_data_request("[[DATA_REQUEST type=period_by_date date=2024-03-15]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 20), now()).unwrap();
    assert!(envelope.error.is_none());
    assert_eq!(envelope.data.unwrap()["period"]["id"], period.id);

    let pairs = parse_data_request("[[DATA_REQUEST type=period_by_date date=2030-01-01]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 20), now()).unwrap();
    assert_eq!(envelope.error.unwrap(), "No period covers this date");
}

#[test]
fn database_overview_works_on_an_empty_database() {
    let mut conn = setup();
    let pairs = parse_data_request("[[DATA_REQUEST type=database_overview]]").unwrap();
    let envelope = respond(&mut conn, &pairs, date(2024, 3, 10), now()).unwrap();
    assert!(envelope.error.is_none());
    let data = envelope.data.unwrap();
    assert_eq!(data["transaction_count"], 0);
    assert_eq!(data["periods_count"], 0);
}
