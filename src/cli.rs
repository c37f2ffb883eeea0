// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print JSON instead of a table")
        .action(ArgAction::SetTrue)
}

fn date_arg() -> Arg {
    Arg::new("date")
        .long("date")
        .help("Effective date (YYYY-MM-DD), defaults to today")
}

pub fn build_cli() -> Command {
    Command::new("steward")
        .about("Envelope-style personal budgeting with income splits, monthly periods, and an AI money assistant")
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("category")
                .about("Category catalog")
                .subcommand(Command::new("list").arg(json_flag()))
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("icon").long("icon").default_value(""))
                        .arg(Arg::new("color").long("color").default_value("#9E9E9E"))
                        .arg(
                            Arg::new("position")
                                .long("position")
                                .value_parser(value_parser!(i64))
                                .default_value("0"),
                        )
                        .arg(
                            Arg::new("unexpected")
                                .long("unexpected")
                                .help("Expenses in this category require a comment")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Key/value tunables (habit heuristics, AI endpoint)")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("value").long("value").required(true)),
                )
                .subcommand(
                    Command::new("get").arg(Arg::new("key").long("key").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("params")
                .about("Versioned financial parameters")
                .subcommand(Command::new("show").arg(json_flag()))
                .subcommand(
                    Command::new("set")
                        .about("Create a new parameter version and resync the active period")
                        .arg(
                            Arg::new("income")
                                .long("income")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(Arg::new("currency").long("currency"))
                        .arg(
                            Arg::new("tithing")
                                .long("tithing")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("main-saving")
                                .long("main-saving")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("extra-saving")
                                .long("extra-saving")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("percent")
                                .long("percent")
                                .help("Category split as NAME=PCT, repeatable; must sum to 100")
                                .action(ArgAction::Append)
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("history").arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(value_parser!(i64))
                            .default_value("10"),
                    ),
                ),
        )
        .subcommand(
            Command::new("period")
                .about("Financial periods")
                .subcommand(Command::new("status").arg(json_flag()))
                .subcommand(
                    Command::new("new")
                        .about("Start a new period from a primary income")
                        .arg(
                            Arg::new("income")
                                .long("income")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("check")
                        .about("Roll over the period when its end date has passed")
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(i64))
                                .default_value("12"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("sync")
                        .about("Re-apply the active parameters to the running period"),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Ledger entries")
                .subcommand(
                    Command::new("expense")
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("comment").long("comment"))
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("income")
                        .about("Record a primary income into the active period")
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .default_value("Main income"),
                        )
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("extra")
                        .about("Record an occasional income")
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .arg(Arg::new("type").long("type").help("income_main|income_extra|expense"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Category budgets of the active period")
                .subcommand(Command::new("status").arg(json_flag())),
        )
        .subcommand(
            Command::new("alert")
                .about("Alerts for the active period")
                .subcommand(
                    Command::new("list")
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(i64))
                                .default_value("20"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("read").arg(
                        Arg::new("id")
                            .long("id")
                            .value_parser(value_parser!(i64))
                            .required(true),
                    ),
                ),
        )
        .subcommand(
            Command::new("habit")
                .about("Multi-period spending habit analysis")
                .subcommand(
                    Command::new("analyze")
                        .arg(
                            Arg::new("periods")
                                .long("periods")
                                .value_parser(value_parser!(i64))
                                .default_value("3"),
                        )
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("chat")
                .about("AI assistant threads")
                .subcommand(Command::new("threads").arg(json_flag()))
                .subcommand(Command::new("new").arg(Arg::new("title").long("title")))
                .subcommand(
                    Command::new("messages")
                        .arg(
                            Arg::new("thread")
                                .long("thread")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("send")
                        .arg(
                            Arg::new("thread")
                                .long("thread")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(Arg::new("message").long("message").required(true))
                        .arg(Arg::new("user").long("user").default_value("Richard")),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Periodic AI notifications")
                .subcommand(
                    Command::new("run")
                        .arg(
                            Arg::new("timeframe")
                                .long("timeframe")
                                .help("week|month|year; all three when omitted"),
                        )
                        .arg(
                            Arg::new("dry-run")
                                .long("dry-run")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
                        .arg(date_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .arg(Arg::new("timeframe").long("timeframe"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(i64))
                                .default_value("50"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("read")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)))
                        .arg(Arg::new("all").long("all").action(ArgAction::SetTrue)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("JSON and CSV exports")
                .subcommand(
                    Command::new("period").arg(
                        Arg::new("id")
                            .long("id")
                            .value_parser(value_parser!(i64))
                            .help("Period id, defaults to the active period"),
                    ),
                )
                .subcommand(
                    Command::new("year").arg(
                        Arg::new("year")
                            .long("year")
                            .value_parser(value_parser!(i32))
                            .required(true),
                    ),
                )
                .subcommand(
                    Command::new("transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .help("csv|json")
                                .default_value("csv"),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Dashboard data payloads")
                .subcommand(Command::new("budget-data"))
                .subcommand(Command::new("stats-series")),
        )
        .subcommand(Command::new("doctor").about("Consistency checks over the ledger"))
}
