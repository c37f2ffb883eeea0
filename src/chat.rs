// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Chat threads and the assistant send flow. The user's message is stored
//! before any network call so it is never lost; a failed AI call only
//! costs the assistant turn.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};

use crate::ai::{GeminiClient, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::context::financial_context;
use crate::dispatch::{parse_data_request, respond};
use crate::models::{ChatMessage, ChatThread};
use crate::period::active_period;

const CHAT_SYSTEM_PROMPT: &str = include_str!("../prompts/chat_system.txt");
const SUMMARY_SYSTEM_PROMPT: &str = include_str!("../prompts/chat_summary.txt");

/// Inline/structural tags the assistant is allowed to emit.
const ALLOWED_TAGS: [&str; 8] = ["p", "ul", "ol", "li", "strong", "em", "h4", "br"];

const SUMMARY_THROTTLE_MINUTES: i64 = 10;
const SUMMARY_MIN_MESSAGES: usize = 4;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());

/// Drop every tag that is not on the allow-list, keeping the text between
/// them.
pub fn sanitize_html(html: &str) -> String {
    TAG_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let name = caps[1].to_lowercase();
            if ALLOWED_TAGS.contains(&name.as_str()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .trim()
        .to_string()
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Render assistant text for the UI: sanitize when it already carries
/// markup, otherwise escape and preserve line breaks.
pub fn format_assistant_content(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "<p>No answer available.</p>".to_string();
    }
    if trimmed.contains('<') {
        return sanitize_html(trimmed);
    }
    let escaped = escape_html(trimmed).replace('\n', "<br>");
    format!("<p>{}</p>", escaped)
}

fn thread_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ChatThread> {
    Ok(ChatThread {
        id: r.get(0)?,
        period_id: r.get(1)?,
        title: r.get(2)?,
        summary_text: r.get(3)?,
        summary_updated_at: r.get(4)?,
        created_at: r.get(5)?,
        updated_at: r.get(6)?,
    })
}

const THREAD_COLS: &str =
    "id, period_id, title, summary_text, summary_updated_at, created_at, updated_at";

pub fn chat_threads(conn: &Connection, limit: i64) -> Result<Vec<ChatThread>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {THREAD_COLS} FROM ai_chat_threads ORDER BY updated_at DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], thread_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn thread_by_id(conn: &Connection, thread_id: i64) -> Result<Option<ChatThread>> {
    let row = conn
        .query_row(
            &format!("SELECT {THREAD_COLS} FROM ai_chat_threads WHERE id=?1"),
            params![thread_id],
            thread_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn create_thread(conn: &Connection, period_id: Option<i64>, title: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO ai_chat_threads(period_id, title) VALUES (?1, ?2)",
        params![period_id, title],
    )?;
    Ok(conn.last_insert_rowid())
}

fn touch_thread(conn: &Connection, thread_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE ai_chat_threads SET updated_at=CURRENT_TIMESTAMP WHERE id=?1",
        params![thread_id],
    )?;
    Ok(())
}

pub fn add_message(conn: &Connection, thread_id: i64, role: &str, content: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO ai_chat_messages(thread_id, role, content) VALUES (?1, ?2, ?3)",
        params![thread_id, role, content],
    )?;
    let id = conn.last_insert_rowid();
    touch_thread(conn, thread_id)?;
    Ok(id)
}

pub fn messages(conn: &Connection, thread_id: i64, limit: i64) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, thread_id, role, content, created_at
         FROM ai_chat_messages WHERE thread_id=?1 ORDER BY id ASC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![thread_id, limit], |r| {
        Ok(ChatMessage {
            id: r.get(0)?,
            thread_id: r.get(1)?,
            role: r.get(2)?,
            content: r.get(3)?,
            created_at: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextMeta {
    pub period_id: Option<i64>,
    pub active_period_id: Option<i64>,
    pub source: String,
}

/// Pin a thread to the active period. A thread created under an older
/// period is moved forward the next time it is used.
pub fn resolve_context_period(
    conn: &Connection,
    thread_id: i64,
    thread_period_id: Option<i64>,
) -> Result<ContextMeta> {
    let Some(active) = active_period(conn)? else {
        return Ok(ContextMeta {
            period_id: thread_period_id,
            active_period_id: None,
            source: "thread_period".into(),
        });
    };

    if thread_period_id != Some(active.id) {
        if thread_id > 0 {
            conn.execute(
                "UPDATE ai_chat_threads SET period_id=?1 WHERE id=?2",
                params![active.id, thread_id],
            )?;
        }
        return Ok(ContextMeta {
            period_id: Some(active.id),
            active_period_id: Some(active.id),
            source: "active_period".into(),
        });
    }

    Ok(ContextMeta {
        period_id: thread_period_id,
        active_period_id: Some(active.id),
        source: "thread_period".into(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: i64,
    pub title: String,
    pub summary_text: Option<String>,
    pub updated_at: String,
}

/// Threads whose title or stored summary shares query terms (4+ chars)
/// with the message being asked.
pub fn relevant_thread_summaries(
    conn: &Connection,
    query: &str,
    exclude_thread_id: i64,
    limit: i64,
) -> Result<Vec<ThreadSummary>> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() >= 4)
        .map(|w| w.to_string())
        .collect();
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let clauses: Vec<String> = (0..terms.len())
        .map(|i| {
            format!(
                "(lower(t.title) LIKE ?{} OR lower(t.summary_text) LIKE ?{})",
                i * 2 + 1,
                i * 2 + 2
            )
        })
        .collect();
    let sql = format!(
        "SELECT t.id, t.title, t.summary_text, t.updated_at
         FROM ai_chat_threads t
         WHERE ({}) AND t.summary_text IS NOT NULL AND t.id != ?{}
         ORDER BY t.updated_at DESC LIMIT ?{}",
        clauses.join(" OR "),
        terms.len() * 2 + 1,
        terms.len() * 2 + 2
    );

    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    for term in &terms {
        let pattern = format!("%{}%", term);
        args.push(Box::new(pattern.clone()));
        args.push(Box::new(pattern));
    }
    args.push(Box::new(exclude_thread_id));
    args.push(Box::new(limit));

    let mut stmt = conn.prepare(&sql)?;
    let arg_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(arg_refs.as_slice(), |r| {
        Ok(ThreadSummary {
            id: r.get(0)?,
            title: r.get(1)?,
            summary_text: r.get(2)?,
            updated_at: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn recent_thread_summaries(
    conn: &Connection,
    exclude_thread_id: i64,
    limit: i64,
) -> Result<Vec<ThreadSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, summary_text, updated_at
         FROM ai_chat_threads
         WHERE summary_text IS NOT NULL AND id != ?1
         ORDER BY updated_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![exclude_thread_id, limit], |r| {
        Ok(ThreadSummary {
            id: r.get(0)?,
            title: r.get(1)?,
            summary_text: r.get(2)?,
            updated_at: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Build the JSON prompt payload for one user turn.
pub fn build_chat_prompt(
    conn: &mut Connection,
    thread_id: i64,
    user_message: &str,
    user_name: &str,
    today: NaiveDate,
) -> Result<String> {
    let thread = thread_by_id(conn, thread_id)?;
    let context_meta =
        resolve_context_period(conn, thread_id, thread.as_ref().and_then(|t| t.period_id))?;
    let context = financial_context(conn, context_meta.period_id, today)?;
    let history: Vec<String> = messages(conn, thread_id, 20)?
        .into_iter()
        .map(|m| {
            let role = if m.role == "assistant" { "Assistant" } else { "User" };
            format!("{}: {}", role, m.content)
        })
        .collect();

    let relevant = relevant_thread_summaries(conn, user_message, thread_id, 4)?;
    let recent = recent_thread_summaries(conn, thread_id, 4)?;

    let payload = serde_json::json!({
        "user_name": user_name,
        "context": context,
        "context_meta": context_meta,
        "history": history,
        "relevant_summaries": relevant,
        "recent_summaries": recent,
        "question": user_message,
    });
    Ok(serde_json::to_string_pretty(&payload)?)
}

/// Refresh a thread's stored summary. Strictly best-effort: throttled,
/// and every failure is dropped since the summary is a caching aid, not
/// authoritative state.
pub fn update_thread_summary(
    conn: &Connection,
    client: &GeminiClient,
    thread_id: i64,
    now: NaiveDateTime,
) -> Result<()> {
    let Some(thread) = thread_by_id(conn, thread_id)? else {
        return Ok(());
    };

    if let Some(updated_at) = &thread.summary_updated_at {
        if let Ok(last) = NaiveDateTime::parse_from_str(updated_at, "%Y-%m-%d %H:%M:%S") {
            if (now - last).num_minutes() < SUMMARY_THROTTLE_MINUTES {
                return Ok(());
            }
        }
    }

    let messages = messages(conn, thread_id, 40)?;
    if messages.is_empty() {
        return Ok(());
    }
    if messages.len() < SUMMARY_MIN_MESSAGES && thread.summary_text.is_some() {
        return Ok(());
    }

    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            let role = if m.role == "assistant" { "Assistant" } else { "User" };
            format!("{}: {}", role, m.content)
        })
        .collect();
    let user_prompt = format!("Summarize the following discussion:\n\n{}", lines.join("\n"));

    let summary = match client.generate(SUMMARY_SYSTEM_PROMPT, &user_prompt, 0.2, 400) {
        Ok(s) => s,
        Err(e) => {
            warn!("thread summary refresh skipped: {}", e);
            return Ok(());
        }
    };
    let summary = summary.trim();
    if summary.is_empty() {
        return Ok(());
    }

    conn.execute(
        "UPDATE ai_chat_threads
         SET summary_text=?1, summary_updated_at=CURRENT_TIMESTAMP WHERE id=?2",
        params![summary, thread_id],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub content: String,
    pub content_html: String,
}

/// One user turn: store the message, ask the assistant, serve at most one
/// embedded data request, store the (possibly apologetic) reply.
pub fn send_message(
    conn: &mut Connection,
    client: &GeminiClient,
    thread_id: i64,
    message: &str,
    user_name: &str,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<AssistantReply> {
    let message = message.trim();
    if thread_id <= 0 || message.is_empty() {
        anyhow::bail!("Invalid message");
    }

    add_message(conn, thread_id, "user", message)?;

    let user_prompt = format!(
        "JSON data:\n{}",
        build_chat_prompt(conn, thread_id, message, user_name, today)?
    );

    let assistant_content = match client.generate(
        CHAT_SYSTEM_PROMPT,
        &user_prompt,
        DEFAULT_TEMPERATURE,
        DEFAULT_MAX_TOKENS,
    ) {
        Ok(first_reply) => {
            if let Some(request) = parse_data_request(&first_reply) {
                info!(thread_id, "assistant issued a DATA_REQUEST");
                let envelope = respond(conn, &request, today, now)?;
                let payload = serde_json::to_string_pretty(&envelope)?;
                let follow_up = format!(
                    "{}\n\nRequested data (DATA_REQUEST tool):\n{}",
                    user_prompt, payload
                );
                // The second response is final; a directive inside it is
                // left as-is to stop any recursion.
                match client.generate(CHAT_SYSTEM_PROMPT, &follow_up, 0.2, DEFAULT_MAX_TOKENS) {
                    Ok(second_reply) => second_reply,
                    Err(e) => format!(
                        "Sorry, something went wrong while calling the AI service: {}",
                        e
                    ),
                }
            } else {
                first_reply
            }
        }
        Err(e) => format!(
            "Sorry, something went wrong while calling the AI service: {}",
            e
        ),
    };

    add_message(conn, thread_id, "assistant", &assistant_content)?;
    update_thread_summary(conn, client, thread_id, now)?;

    let content_html = format_assistant_content(&assistant_content);
    Ok(AssistantReply {
        content: assistant_content,
        content_html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_allowed_tags_only() {
        let html = "<p>Hi <strong>there</strong> <script>alert(1)</script><div>x</div></p>";
        assert_eq!(
            sanitize_html(html),
            "<p>Hi <strong>there</strong> alert(1)x</p>"
        );
    }

    #[test]
    fn plain_text_is_escaped_and_wrapped() {
        let out = format_assistant_content("a & b\nnext");
        assert_eq!(out, "<p>a &amp; b<br>next</p>");
    }

    #[test]
    fn empty_reply_gets_placeholder() {
        assert_eq!(format_assistant_content("   "), "<p>No answer available.</p>");
    }
}
