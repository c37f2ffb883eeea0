// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{all_categories, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let icon = sub.get_one::<String>("icon").unwrap();
            let color = sub.get_one::<String>("color").unwrap();
            let position = *sub.get_one::<i64>("position").unwrap();
            let unexpected = sub.get_flag("unexpected");
            conn.execute(
                "INSERT INTO budget_categories(name, icon, color, position, is_unexpected)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, icon, color, position, unexpected as i64],
            )?;
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let categories = all_categories(conn)?;
            if !maybe_print_json(sub.get_flag("json"), &categories)? {
                let rows = categories
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name.clone(),
                            c.icon.clone(),
                            c.color.clone(),
                            if c.is_unexpected { "yes".into() } else { "".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Id", "Category", "Icon", "Color", "Unexpected"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}
