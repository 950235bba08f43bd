// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, arg, value_parser};

fn with_output_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Output JSON").conflicts_with("jsonl"))
        .arg(arg!(--jsonl "Output one JSON object per line"))
}

fn id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Record id")
}

fn list_cmd(settled: &'static str, with_category: bool) -> Command {
    let mut cmd = Command::new("list")
        .about("List entries")
        .arg(arg!(--month <MONTH> "Restrict to a month (YYYY-MM)"))
        .arg(
            Arg::new("status")
                .long("status")
                .value_parser([settled, "pending"])
                .help("Filter by settlement"),
        );
    if with_category {
        cmd = cmd.arg(arg!(--category <CATEGORY> "Filter by category"));
    }
    with_output_flags(cmd)
}

fn entry_cmd(name: &'static str, about: &'static str, settled: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record a new entry")
                .arg(arg!(--description <TEXT> "What it was").required(true))
                .arg(arg!(--amount <AMOUNT> "Amount in BRL").required(true))
                .arg(arg!(--date <DATE> "Entry date (YYYY-MM-DD), defaults to today"))
                .arg(arg!(--category <CATEGORY> "Category").default_value("Outras"))
                .arg(
                    Arg::new("settled")
                        .long(settled)
                        .action(ArgAction::SetTrue)
                        .help("Already settled"),
                ),
        )
        .subcommand(list_cmd(settled, true))
        .subcommand(
            Command::new("toggle")
                .about("Flip the settlement flag")
                .arg(id_arg()),
        )
        .subcommand(Command::new("rm").about("Delete an entry").arg(id_arg()))
}

fn due_cmd(
    name: &'static str,
    about: &'static str,
    settle_verb: &'static str,
    settled: &'static str,
    with_category: bool,
) -> Command {
    let mut add = Command::new("add")
        .about("Record a new item")
        .arg(arg!(--description <TEXT> "What it is").required(true))
        .arg(arg!(--amount <AMOUNT> "Amount in BRL").required(true))
        .arg(arg!(--due <DATE> "Due date (YYYY-MM-DD)").required(true));
    if with_category {
        add = add.arg(arg!(--category <CATEGORY> "Category").default_value("Outras"));
    }
    Command::new(name)
        .about(about)
        .subcommand_required(true)
        .subcommand(add)
        .subcommand(list_cmd(settled, with_category))
        .subcommand(
            Command::new(settle_verb)
                .about("Mark as settled")
                .arg(id_arg()),
        )
        .subcommand(Command::new("rm").about("Delete an item").arg(id_arg()))
}

pub fn build_cli() -> Command {
    Command::new("gestaomei")
        .about("Bookkeeping for Brazilian MEI micro-entrepreneurs")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("account")
                .about("Sign up, log in and inspect the subscription")
                .subcommand_required(true)
                .subcommand(
                    Command::new("signup")
                        .about("Create an account on a free trial")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--email <EMAIL>).required(true))
                        .arg(arg!(--password <PASSWORD>).required(true)),
                )
                .subcommand(
                    Command::new("login")
                        .about("Open a session")
                        .arg(arg!(--email <EMAIL>).required(true))
                        .arg(arg!(--password <PASSWORD>).required(true)),
                )
                .subcommand(Command::new("logout").about("Close the session"))
                .subcommand(with_output_flags(
                    Command::new("status").about("Show account and subscription"),
                )),
        )
        .subcommand(entry_cmd("income", "Revenue entries", "received"))
        .subcommand(entry_cmd("expense", "Expense entries", "paid"))
        .subcommand(due_cmd(
            "payable",
            "Bills to pay",
            "pay",
            "paid",
            true,
        ))
        .subcommand(due_cmd(
            "receivable",
            "Amounts to collect",
            "receive",
            "received",
            false,
        ))
        .subcommand(with_output_flags(
            Command::new("dashboard")
                .about("Month overview with MEI limit usage")
                .arg(arg!(--month <MONTH> "Month to show (YYYY-MM), defaults to the current one")),
        ))
        .subcommand(
            Command::new("das")
                .about("DAS tax")
                .subcommand_required(true)
                .subcommand(with_output_flags(
                    Command::new("calc")
                        .about("Monthly and annual DAS for an activity category")
                        .arg(
                            arg!(--category <CATEGORY> "commerce | services | commerce_and_services")
                                .required(true),
                        )
                        .arg(arg!(--estimate <REVENUE> "Use an estimated annual revenue"))
                        .arg(arg!(--share "Print a plain-text summary")),
                )),
        )
        .subcommand(with_output_flags(
            Command::new("alerts")
                .about("Current alerts and MEI summary")
                .arg(
                    Arg::new("dismiss")
                        .long("dismiss")
                        .action(ArgAction::Append)
                        .value_name("ID")
                        .help("Hide an alert for this run"),
                ),
        ))
        .subcommand(
            with_output_flags(
                Command::new("report")
                    .about("Period report")
                    .arg(arg!(--from <DATE> "Start date, defaults to January 1st"))
                    .arg(arg!(--to <DATE> "End date, defaults to today")),
            )
            .subcommand(
                Command::new("export")
                    .about("Write the period's entries to a file")
                    .arg(arg!(--format <FMT> "csv | json").required(true))
                    .arg(arg!(--out <PATH>).required(true))
                    .arg(arg!(--from <DATE>))
                    .arg(arg!(--to <DATE>)),
            ),
        )
        .subcommand(
            Command::new("backup")
                .about("Export every record to a JSON file")
                .arg(arg!(--out <PATH>).required(true)),
        )
        .subcommand(
            Command::new("subscription")
                .about("Payment notifications and trial sweeps")
                .subcommand_required(true)
                .subcommand(
                    Command::new("webhook")
                        .about("Apply a signed payment notification")
                        .arg(arg!(--payload <FILE> "JSON body").required(true))
                        .arg(arg!(--signature <HEX> "HMAC-SHA256 of the body").required(true)),
                )
                .subcommand(
                    Command::new("expire-check").about("Expire every elapsed trial"),
                ),
        )
        .subcommand(
            Command::new("notifications")
                .about("Notification preferences")
                .subcommand_required(true)
                .subcommand(with_output_flags(
                    Command::new("show").about("Show current preferences"),
                ))
                .subcommand(
                    Command::new("set")
                        .about("Change preferences")
                        .arg(
                            Arg::new("upcoming-due")
                                .long("upcoming-due")
                                .value_parser(value_parser!(bool)),
                        )
                        .arg(
                            Arg::new("weekly-report")
                                .long("weekly-report")
                                .value_parser(value_parser!(bool)),
                        )
                        .arg(
                            Arg::new("mei-limit")
                                .long("mei-limit")
                                .value_parser(value_parser!(bool)),
                        )
                        .arg(
                            Arg::new("lead-days")
                                .long("lead-days")
                                .value_parser(value_parser!(u32))
                                .help("1, 3, 5 or 7"),
                        )
                        .arg(arg!(--email <EMAIL> "Where notifications go")),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn dismiss_accepts_many() {
        let m = build_cli().get_matches_from([
            "gestaomei",
            "alerts",
            "--dismiss",
            "backup",
            "--dismiss",
            "das-due",
        ]);
        let (_, sub) = m.subcommand().unwrap();
        let ids: Vec<&String> = sub.get_many::<String>("dismiss").unwrap().collect();
        assert_eq!(ids, ["backup", "das-due"]);
    }
}
