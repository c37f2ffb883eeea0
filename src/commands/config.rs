// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Key/value tunables: habit heuristic references and thresholds, AI
//! endpoint override.

use anyhow::Result;
use rusqlite::Connection;

use crate::utils::{get_setting, pretty_table, set_setting};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            set_setting(conn, key, value)?;
            println!("{} = {}", key, value);
        }
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            match get_setting(conn, key)? {
                Some(value) => println!("{}", value),
                None => println!("(unset)"),
            }
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
            let rows = stmt.query_map([], |r| {
                Ok(vec![r.get::<_, String>(0)?, r.get::<_, String>(1)?])
            })?;
            let mut data = Vec::new();
            for row in rows {
                data.push(row?);
            }
            println!("{}", pretty_table(&["Key", "Value"], data));
        }
        _ => {}
    }
    Ok(())
}
