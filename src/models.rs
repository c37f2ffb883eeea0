// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Versioned financial parameters. Exactly one row is active at a time;
/// a settings change inserts a new version instead of mutating an old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    pub id: i64,
    pub default_income: i64,
    pub currency: String,
    pub tithing_percent: i64,
    pub main_saving_percent: i64,
    pub extra_saving_percent: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub position: i64,
    pub is_unexpected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub parameters_version: i64,
    pub initial_income: i64,
    pub tithing_amount: i64,
    pub saving_amount: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    IncomeMain,
    IncomeExtra,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::IncomeMain => "income_main",
            TxType::IncomeExtra => "income_extra",
            TxType::Expense => "expense",
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Normal,
    Warning,
    Critical,
    Over,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Normal => "normal",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Critical => "critical",
            BudgetStatus::Over => "over",
        }
    }
}

/// A category budget within one period, joined with its category and the
/// derived usage fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetView {
    pub id: i64,
    pub period_id: i64,
    pub category_id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_unexpected: bool,
    pub allocated_amount: i64,
    pub spent_amount: i64,
    pub remaining: i64,
    pub percentage_used: f64,
    pub status: BudgetStatus,
    pub is_over: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub period_id: i64,
    pub kind: String,
    pub level: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: i64,
    pub period_id: Option<i64>,
    pub title: String,
    pub summary_text: Option<String>,
    pub summary_updated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub thread_id: i64,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub period_id: Option<i64>,
    pub timeframe: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub export_path: String,
    pub analysis_html: String,
    pub raw_response: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}
