// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{Ctx, ledger_user, list_filter, output_flags, required, required_id};
use crate::aggregate::sum_where;
use crate::store::{self, LedgerTable};
use crate::utils::{fmt_brl, maybe_print_json, parse_date, parse_decimal, pretty_table, yes_no};

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let description = required(sub, "description")?;
            let amount = parse_decimal(required(sub, "amount")?)?;
            let due = parse_date(required(sub, "due")?)?;
            let id = store::insert_receivable(conn, user.id, description, amount, due)?;
            println!("Recorded receivable #{}: {} due {}", id, fmt_brl(&amount), due);
        }
        Some(("list", sub)) => {
            let (json_flag, jsonl_flag) = output_flags(sub);
            let data = store::query_receivables(conn, &list_filter(sub, user.id)?)?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows: Vec<Vec<String>> = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.due_date.to_string(),
                            r.description.clone(),
                            fmt_brl(&r.amount),
                            yes_no(r.received),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Due", "Description", "Amount", "Received"], rows)
                );
                println!(
                    "Received: {}  To collect: {}",
                    fmt_brl(&sum_where(&data, |r| r.received)),
                    fmt_brl(&sum_where(&data, |r| !r.received))
                );
            }
        }
        Some(("receive", sub)) => {
            let id = required_id(sub)?;
            store::mark_receivable_received(conn, user.id, id)?;
            println!("Receivable #{} received", id);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            store::delete(conn, LedgerTable::Receivables, user.id, id)?;
            println!("Deleted receivable #{}", id);
        }
        _ => {}
    }
    Ok(())
}
