// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Steward", "steward"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("steward.sqlite"))
}

/// Directory where JSON exports and AI-notification payloads are written.
pub fn exports_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let dir = proj.data_dir().join("exports").join("json");
    fs::create_dir_all(&dir).context("Failed to create exports dir")?;
    Ok(dir)
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS parameters(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        default_income INTEGER NOT NULL,
        currency TEXT NOT NULL,
        tithing_percent INTEGER NOT NULL,
        main_saving_percent INTEGER NOT NULL,
        extra_saving_percent INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS budget_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        icon TEXT NOT NULL DEFAULT '',
        color TEXT NOT NULL DEFAULT '#9E9E9E',
        position INTEGER NOT NULL DEFAULT 0,
        is_unexpected INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS budget_percentages(
        parameters_version INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        percentage INTEGER NOT NULL,
        UNIQUE(parameters_version, category_id),
        FOREIGN KEY(parameters_version) REFERENCES parameters(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES budget_categories(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS financial_periods(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        parameters_version INTEGER NOT NULL,
        initial_income INTEGER NOT NULL,
        tithing_amount INTEGER NOT NULL DEFAULT 0,
        saving_amount INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY(parameters_version) REFERENCES parameters(id)
    );
    CREATE INDEX IF NOT EXISTS idx_periods_active ON financial_periods(is_active);

    CREATE TABLE IF NOT EXISTS period_budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        allocated_amount INTEGER NOT NULL DEFAULT 0,
        spent_amount INTEGER NOT NULL DEFAULT 0,
        UNIQUE(period_id, category_id),
        FOREIGN KEY(period_id) REFERENCES financial_periods(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES budget_categories(id)
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income_main','income_extra','expense')),
        category_id INTEGER,
        amount INTEGER NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        comment TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        tithing_paid INTEGER NOT NULL DEFAULT 0,
        saving_paid INTEGER NOT NULL DEFAULT 0,
        balance_after INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(period_id) REFERENCES financial_periods(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES budget_categories(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_period ON transactions(period_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

    CREATE TABLE IF NOT EXISTS deferred_tithing(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        amount INTEGER NOT NULL,
        source_period_id INTEGER NOT NULL,
        target_period_id INTEGER,
        is_paid INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(source_period_id) REFERENCES financial_periods(id)
    );

    CREATE TABLE IF NOT EXISTS alerts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('threshold','habit')),
        level TEXT NOT NULL CHECK(level IN ('warning','danger')),
        message TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(period_id) REFERENCES financial_periods(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_alerts_period ON alerts(period_id, is_read);

    CREATE TABLE IF NOT EXISTS ai_chat_threads(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER,
        title TEXT NOT NULL,
        summary_text TEXT,
        summary_updated_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS ai_chat_messages(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        thread_id INTEGER NOT NULL,
        role TEXT NOT NULL CHECK(role IN ('user','assistant')),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(thread_id) REFERENCES ai_chat_threads(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS ai_notifications(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER,
        timeframe TEXT NOT NULL CHECK(timeframe IN ('week','month','year')),
        range_start TEXT NOT NULL,
        range_end TEXT NOT NULL,
        export_path TEXT NOT NULL,
        analysis_html TEXT NOT NULL,
        raw_response TEXT,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_notifications_range
        ON ai_notifications(timeframe, range_start, range_end);

    CREATE TABLE IF NOT EXISTS export_history(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period_id INTEGER,
        export_type TEXT NOT NULL,
        file_path TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    seed_default_categories(conn)?;
    Ok(())
}

/// The stock category catalog. Contingency is the mandatory-comment bucket.
fn seed_default_categories(conn: &Connection) -> Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM budget_categories", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    conn.execute_batch(
        r#"
    INSERT INTO budget_categories(name, icon, color, position, is_unexpected) VALUES
        ('Food', 'utensils', '#4CAF50', 1, 0),
        ('Transport', 'bus', '#2196F3', 2, 0),
        ('Communication', 'phone', '#9C27B0', 3, 0),
        ('Household', 'home', '#FF9800', 4, 0),
        ('Contingency', 'alert-triangle', '#F44336', 5, 1);
    "#,
    )?;
    Ok(())
}
