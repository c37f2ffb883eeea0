// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The assistant's data-request protocol.
//!
//! A reply may embed one `[[DATA_REQUEST <payload>]]` directive, where the
//! payload is a JSON object or `key=value` tokens and always carries a
//! `type` key. The payload is parsed once into a closed set of request
//! variants; anything unknown becomes the explicit `Unsupported` variant.
//! Every execution returns the same envelope shape, with validation
//! problems reported inside it rather than as errors to the caller.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::context::{database_overview, financial_context, range_data};
use crate::period::{period_by_id, period_on_date, recent_period_summaries};
use crate::utils::month_bounds;

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[DATA_REQUEST\s*([^\]]+)\]\]").unwrap());
static PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)=("[^"]*"|'[^']*'|\S+)"#).unwrap());
static YEAR_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

pub type RawRequest = BTreeMap<String, Value>;

/// Extract the first directive from assistant text. Returns the raw
/// key/value pairs (keys lowercased) or None when there is no directive or
/// it lacks a `type` key.
pub fn parse_data_request(text: &str) -> Option<RawRequest> {
    let payload = DIRECTIVE_RE.captures(text)?.get(1)?.as_str().trim();
    if payload.is_empty() {
        return None;
    }

    if payload.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(payload) {
            let pairs: RawRequest = map
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect();
            if !pairs.contains_key("type") {
                return None;
            }
            return Some(pairs);
        }
    }

    let mut pairs = RawRequest::new();
    for cap in PAIR_RE.captures_iter(payload) {
        let key = cap[1].to_lowercase();
        let value = cap[2].trim_matches(|c| c == '"' || c == '\'').to_string();
        pairs.insert(key, Value::String(value));
    }
    if !pairs.contains_key("type") {
        return None;
    }
    Some(pairs)
}

/// The closed set of requests the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRequest {
    CurrentPeriod,
    Period { id: i64 },
    PeriodByDate { date: NaiveDate },
    Range { start: NaiveDate, end: NaiveDate },
    LastDays { days: i64, end: NaiveDate },
    Month { year: i32, month: u32 },
    Year { year: i32 },
    RecentPeriods { limit: i64 },
    DatabaseOverview,
    Unsupported { type_name: String },
}

fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn value_as_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn pair_i64(pairs: &RawRequest, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .find_map(|k| pairs.get(*k))
        .and_then(value_as_i64)
}

fn pair_str(pairs: &RawRequest, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| pairs.get(*k))
        .and_then(value_as_str)
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

impl DataRequest {
    /// Resolve raw pairs into a request variant. Parameter problems come
    /// back as `Err(message)` and end up in the envelope's error field.
    pub fn resolve(pairs: &RawRequest, today: NaiveDate) -> Result<DataRequest, String> {
        let type_name = pair_str(pairs, &["type"])
            .unwrap_or_default()
            .to_lowercase();

        match type_name.as_str() {
            "active_period" | "current_period" | "active" | "current" => {
                Ok(DataRequest::CurrentPeriod)
            }

            "period" => {
                let id = pair_i64(pairs, &["period_id", "id"]).unwrap_or(0);
                if id <= 0 {
                    return Err("Invalid period_id".into());
                }
                Ok(DataRequest::Period { id })
            }

            "period_by_date" | "period_on" => {
                let raw = pair_str(pairs, &["date", "on"])
                    .ok_or("Invalid date (expected format: YYYY-MM-DD)")?;
                let date = parse_iso_date(&raw)
                    .ok_or("Invalid date (expected format: YYYY-MM-DD)")?;
                Ok(DataRequest::PeriodByDate { date })
            }

            "range" => {
                let start = pair_str(pairs, &["start", "start_date"])
                    .and_then(|s| parse_iso_date(&s))
                    .ok_or("Invalid dates (expected format: YYYY-MM-DD)")?;
                let end = pair_str(pairs, &["end", "end_date"])
                    .and_then(|s| parse_iso_date(&s))
                    .ok_or("Invalid dates (expected format: YYYY-MM-DD)")?;
                if start > end {
                    return Err("start_date must be <= end_date".into());
                }
                Ok(DataRequest::Range { start, end })
            }

            "last_days" | "recent_days" => {
                let days = pair_i64(pairs, &["days"]).unwrap_or(30).clamp(1, 365);
                let end = match pair_str(pairs, &["end", "end_date"]) {
                    Some(raw) => parse_iso_date(&raw)
                        .ok_or("Invalid end date (expected format: YYYY-MM-DD)")?,
                    None => today,
                };
                Ok(DataRequest::LastDays { days, end })
            }

            "month" => {
                let raw = pair_str(pairs, &["month"]);
                let (year, month) = match raw.as_deref().and_then(|r| YEAR_MONTH_RE.captures(r)) {
                    Some(caps) => (
                        caps[1].parse::<i64>().unwrap_or(0),
                        caps[2].parse::<i64>().unwrap_or(0),
                    ),
                    None => (
                        pair_i64(pairs, &["year"]).unwrap_or(0),
                        pair_i64(pairs, &["month"]).unwrap_or(0),
                    ),
                };
                if !(2000..=2100).contains(&year) || !(1..=12).contains(&month) {
                    return Err("Invalid month (use month=YYYY-MM or year=YYYY month=MM)".into());
                }
                Ok(DataRequest::Month {
                    year: year as i32,
                    month: month as u32,
                })
            }

            "year" => {
                let year = pair_i64(pairs, &["year"]).unwrap_or(0);
                if !(2000..=2100).contains(&year) {
                    return Err("Invalid year".into());
                }
                Ok(DataRequest::Year { year: year as i32 })
            }

            "recent_periods" => {
                let limit = pair_i64(pairs, &["limit"]).unwrap_or(6).clamp(1, 24);
                Ok(DataRequest::RecentPeriods { limit })
            }

            "database_overview" => Ok(DataRequest::DatabaseOverview),

            other => Ok(DataRequest::Unsupported {
                type_name: other.to_string(),
            }),
        }
    }
}

/// The uniform envelope handed back to the assistant.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub tool: String,
    pub requested_at: String,
    pub request: Value,
    pub error: Option<String>,
    pub data: Option<Value>,
}

impl ToolResponse {
    fn new(pairs: &RawRequest, now: NaiveDateTime) -> Self {
        ToolResponse {
            tool: "DATA_REQUEST".into(),
            requested_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            request: Value::Object(pairs.clone().into_iter().collect()),
            error: None,
            data: None,
        }
    }

    fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }
}

/// Resolve and execute a directive. Infrastructure failures (a broken
/// database) still return `Err`; everything about the request itself is
/// reported inside the envelope.
pub fn respond(
    conn: &mut Connection,
    pairs: &RawRequest,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<ToolResponse> {
    let envelope = ToolResponse::new(pairs, now);

    let request = match DataRequest::resolve(pairs, today) {
        Ok(r) => r,
        Err(message) => return Ok(envelope.with_error(message)),
    };

    match request {
        DataRequest::CurrentPeriod => {
            let context = financial_context(conn, None, today)?;
            envelope.with_data(&context)
        }
        DataRequest::Period { id } => {
            if period_by_id(conn, id)?.is_none() {
                return Ok(envelope.with_error("Period not found"));
            }
            let context = financial_context(conn, Some(id), today)?;
            envelope.with_data(&context)
        }
        DataRequest::PeriodByDate { date } => {
            let Some(period) = period_on_date(conn, date)? else {
                return Ok(envelope.with_error("No period covers this date"));
            };
            let context = financial_context(conn, Some(period.id), today)?;
            envelope.with_data(&context)
        }
        DataRequest::Range { start, end } => {
            let data = range_data(conn, start, end, now)?;
            envelope.with_data(&data)
        }
        DataRequest::LastDays { days, end } => {
            let start = end - Duration::days(days - 1);
            let data = range_data(conn, start, end, now)?;
            envelope.with_data(&data)
        }
        DataRequest::Month { year, month } => {
            let (start, end) = month_bounds(year, month)?;
            let data = range_data(conn, start, end, now)?;
            envelope.with_data(&data)
        }
        DataRequest::Year { year } => {
            let start = NaiveDate::from_ymd_opt(year, 1, 1).context("Year start out of range")?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31).context("Year end out of range")?;
            let data = range_data(conn, start, end, now)?;
            envelope.with_data(&data)
        }
        DataRequest::RecentPeriods { limit } => {
            let summaries = recent_period_summaries(conn, limit)?;
            envelope.with_data(&summaries)
        }
        DataRequest::DatabaseOverview => {
            let overview = database_overview(conn)?;
            envelope.with_data(&overview)
        }
        DataRequest::Unsupported { type_name } => {
            Ok(envelope.with_error(format!("Unsupported request type '{}'", type_name)))
        }
    }
}
