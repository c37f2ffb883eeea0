// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Periodic AI notifications. An external scheduler invokes the batch job;
//! the job itself is idempotent per (timeframe, range) and safe to re-run.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::ai::GeminiClient;
use crate::chat::format_assistant_content;
use crate::context::range_data;
use crate::models::Notification;

const NOTIFICATION_SYSTEM_PROMPT: &str = include_str!("../prompts/notification_system.txt");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
    Year,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Week, Timeframe::Month, Timeframe::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Timeframe> {
        match s {
            "week" => Some(Timeframe::Week),
            "month" => Some(Timeframe::Month),
            "year" => Some(Timeframe::Year),
            _ => None,
        }
    }

    /// The canonical, already-closed range as of `today`: the ISO week of
    /// yesterday (Monday-based), the previous calendar month, or the
    /// previous calendar year.
    pub fn range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let yesterday = today - Duration::days(1);
        match self {
            Timeframe::Week => {
                let start = yesterday
                    - Duration::days(yesterday.weekday().num_days_from_monday() as i64);
                Ok((start, yesterday))
            }
            Timeframe::Month => {
                let first_of_current = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                    .context("Month start out of range")?;
                let end = first_of_current - Duration::days(1);
                let start = NaiveDate::from_ymd_opt(end.year(), end.month(), 1)
                    .context("Month start out of range")?;
                Ok((start, end))
            }
            Timeframe::Year => {
                let year = today.year() - 1;
                let start =
                    NaiveDate::from_ymd_opt(year, 1, 1).context("Year start out of range")?;
                let end =
                    NaiveDate::from_ymd_opt(year, 12, 31).context("Year end out of range")?;
                Ok((start, end))
            }
        }
    }

    /// Whether the scheduler slot for this timeframe is due today.
    pub fn due(&self, today: NaiveDate) -> bool {
        match self {
            Timeframe::Week => today.weekday() == Weekday::Mon,
            Timeframe::Month => today.day() == 1,
            Timeframe::Year => today.month() == 1 && today.day() == 1,
        }
    }
}

pub fn notification_exists(
    conn: &Connection,
    timeframe: Timeframe,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Result<bool> {
    let row: Option<i64> = conn
        .query_row(
            "SELECT id FROM ai_notifications
             WHERE timeframe=?1 AND range_start=?2 AND range_end=?3 LIMIT 1",
            params![timeframe.as_str(), range_start, range_end],
            |r| r.get(0),
        )
        .optional()?;
    Ok(row.is_some())
}

fn notification_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: r.get(0)?,
        period_id: r.get(1)?,
        timeframe: r.get(2)?,
        range_start: r.get(3)?,
        range_end: r.get(4)?,
        export_path: r.get(5)?,
        analysis_html: r.get(6)?,
        raw_response: r.get(7)?,
        is_read: r.get::<_, i64>(8)? != 0,
        created_at: r.get(9)?,
    })
}

const NOTIFICATION_COLS: &str = "id, period_id, timeframe, range_start, range_end, export_path, \
                                 analysis_html, raw_response, is_read, created_at";

pub fn notifications(
    conn: &Connection,
    limit: i64,
    timeframe: Option<Timeframe>,
) -> Result<Vec<Notification>> {
    let (sql, args): (String, Vec<Box<dyn rusqlite::ToSql>>) = match timeframe {
        Some(tf) => (
            format!(
                "SELECT {NOTIFICATION_COLS} FROM ai_notifications
                 WHERE timeframe=?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ),
            vec![Box::new(tf.as_str()), Box::new(limit)],
        ),
        None => (
            format!(
                "SELECT {NOTIFICATION_COLS} FROM ai_notifications
                 ORDER BY created_at DESC, id DESC LIMIT ?1"
            ),
            vec![Box::new(limit)],
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let arg_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(arg_refs.as_slice(), notification_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn overlapping_for_period(
    conn: &Connection,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLS} FROM ai_notifications
         WHERE range_end >= ?1 AND range_start <= ?2
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![start_date, end_date], notification_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn unread_count(conn: &Connection) -> Result<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ai_notifications WHERE is_read=0",
        [],
        |r| r.get(0),
    )?;
    Ok(n)
}

pub fn mark_read(conn: &Connection, notification_id: i64) -> Result<bool> {
    let n = conn.execute(
        "UPDATE ai_notifications SET is_read=1 WHERE id=?1",
        params![notification_id],
    )?;
    Ok(n > 0)
}

pub fn mark_all_read(conn: &Connection) -> Result<i64> {
    let n = conn.execute("UPDATE ai_notifications SET is_read=1 WHERE is_read=0", [])?;
    Ok(n as i64)
}

/// Snapshot a date range to a JSON file under the exports dir.
pub fn export_range_to_json(
    conn: &Connection,
    timeframe: Timeframe,
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDateTime,
    exports_dir: &std::path::Path,
) -> Result<PathBuf> {
    let data = range_data(conn, start, end, now)?;
    let filename = format!("ai_{}_{}_{}.json", timeframe.as_str(), start, end);
    let filepath = exports_dir.join(filename);
    fs::write(&filepath, serde_json::to_string_pretty(&data)?)
        .with_context(|| format!("Write export {}", filepath.display()))?;
    Ok(filepath)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotDue,
    AlreadyGenerated,
    DryRun,
    Created,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub timeframe: Timeframe,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub status: RunStatus,
}

/// Run the notification job for the given timeframes. Re-running for an
/// already-covered range is a no-op.
#[allow(clippy::too_many_arguments)]
pub fn run(
    conn: &mut Connection,
    client: &GeminiClient,
    timeframes: &[Timeframe],
    dry_run: bool,
    force: bool,
    today: NaiveDate,
    now: NaiveDateTime,
    exports_dir: &std::path::Path,
) -> Result<Vec<RunOutcome>> {
    let mut outcomes = Vec::new();

    for &timeframe in timeframes {
        let (start, end) = timeframe.range(today)?;
        if !force && !timeframe.due(today) {
            outcomes.push(RunOutcome {
                timeframe,
                range_start: start,
                range_end: end,
                status: RunStatus::NotDue,
            });
            continue;
        }

        if notification_exists(conn, timeframe, start, end)? {
            info!(timeframe = timeframe.as_str(), %start, %end, "notification already generated");
            outcomes.push(RunOutcome {
                timeframe,
                range_start: start,
                range_end: end,
                status: RunStatus::AlreadyGenerated,
            });
            continue;
        }

        let export_path = export_range_to_json(conn, timeframe, start, end, now, exports_dir)?;

        if dry_run {
            outcomes.push(RunOutcome {
                timeframe,
                range_start: start,
                range_end: end,
                status: RunStatus::DryRun,
            });
            continue;
        }

        let export_payload = fs::read_to_string(&export_path)
            .with_context(|| format!("Read export {}", export_path.display()))?;
        let user_prompt = format!(
            "Analyze the period {} to {}. Here is the JSON data:\n\n{}",
            start, end, export_payload
        );

        let raw_response = client
            .generate(
                NOTIFICATION_SYSTEM_PROMPT,
                &user_prompt,
                crate::ai::DEFAULT_TEMPERATURE,
                crate::ai::DEFAULT_MAX_TOKENS,
            )
            .context("AI notification call")?;
        let analysis_html = format_assistant_content(&raw_response);

        conn.execute(
            "INSERT INTO ai_notifications
             (period_id, timeframe, range_start, range_end, export_path, analysis_html, raw_response, is_read)
             VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                timeframe.as_str(),
                start,
                end,
                export_path.to_string_lossy(),
                analysis_html,
                raw_response
            ],
        )?;
        info!(timeframe = timeframe.as_str(), %start, %end, "notification recorded");

        outcomes.push(RunOutcome {
            timeframe,
            range_start: start,
            range_end: end,
            status: RunStatus::Created,
        });
    }

    Ok(outcomes)
}
