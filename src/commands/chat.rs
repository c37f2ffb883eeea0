// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Local, Utc};
use rusqlite::Connection;

use crate::ai::GeminiClient;
use crate::chat::{
    chat_threads, create_thread, escape_html, format_assistant_content, messages, send_message,
};
use crate::period::active_period;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("threads", sub)) => threads(conn, sub)?,
        Some(("new", sub)) => new(conn, sub)?,
        Some(("messages", sub)) => list_messages(conn, sub)?,
        Some(("send", sub)) => send(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn threads(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let threads = chat_threads(conn, 50)?;
    if maybe_print_json(sub.get_flag("json"), &threads)? {
        return Ok(());
    }
    let rows = threads
        .iter()
        .map(|t| vec![t.id.to_string(), t.title.clone(), t.updated_at.clone()])
        .collect();
    println!("{}", pretty_table(&["Id", "Title", "Updated"], rows));
    Ok(())
}

fn new(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let period = active_period(conn)?;
    let title = match sub.get_one::<String>("title") {
        Some(t) => t.clone(),
        None => format!("Discussion {}", Local::now().format("%d/%m/%Y %H:%M")),
    };
    let thread_id = create_thread(conn, period.map(|p| p.id), &title)?;
    println!("{}", serde_json::json!({ "thread_id": thread_id }));
    Ok(())
}

fn list_messages(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let thread_id = *sub.get_one::<i64>("thread").unwrap();
    let messages = messages(conn, thread_id, 200)?;

    if sub.get_flag("json") {
        let formatted: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let content_html = if msg.role == "assistant" {
                    format_assistant_content(&msg.content)
                } else {
                    format!("<p>{}</p>", escape_html(&msg.content))
                };
                serde_json::json!({
                    "id": msg.id,
                    "role": msg.role,
                    "content": msg.content,
                    "content_html": content_html,
                    "created_at": msg.created_at,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "messages": formatted }))?
        );
        return Ok(());
    }

    for msg in &messages {
        println!("[{}] {}: {}", msg.created_at, msg.role, msg.content);
    }
    Ok(())
}

fn send(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let thread_id = *sub.get_one::<i64>("thread").unwrap();
    let message = sub.get_one::<String>("message").unwrap();
    let user = sub.get_one::<String>("user").unwrap();

    let client = GeminiClient::from_settings(conn)?;
    let reply = send_message(
        conn,
        &client,
        thread_id,
        message,
        user,
        Local::now().date_naive(),
        Utc::now().naive_utc(),
    )?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "success": true,
            "assistant": reply,
        }))?
    );
    Ok(())
}
