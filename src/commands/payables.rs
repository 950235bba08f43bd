// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{Ctx, ledger_user, list_filter, output_flags, required, required_id};
use crate::aggregate::sum_where;
use crate::models::Payable;
use crate::store::{self, LedgerTable};
use crate::utils::{fmt_brl, maybe_print_json, parse_date, parse_decimal, pretty_table};

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let description = required(sub, "description")?;
            let amount = parse_decimal(required(sub, "amount")?)?;
            let due = parse_date(required(sub, "due")?)?;
            let category = required(sub, "category")?;
            let id = store::insert_payable(conn, user.id, description, amount, due, category)?;
            println!("Recorded payable #{}: {} due {}", id, fmt_brl(&amount), due);
        }
        Some(("list", sub)) => list(conn, ctx, user.id, sub)?,
        Some(("pay", sub)) => {
            let id = required_id(sub)?;
            store::mark_payable_paid(conn, user.id, id)?;
            println!("Payable #{} paid", id);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            store::delete(conn, LedgerTable::Payables, user.id, id)?;
            println!("Deleted payable #{}", id);
        }
        _ => {}
    }
    Ok(())
}

/// Payables matching the list flags, earliest due first.
pub fn query_rows(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<Vec<Payable>> {
    let mut rows = store::query_payables(conn, &list_filter(sub, user_id)?)?;
    if let Some(cat) = sub.get_one::<String>("category") {
        rows.retain(|p| p.category.eq_ignore_ascii_case(cat));
    }
    Ok(rows)
}

fn list(conn: &Connection, ctx: &Ctx<'_>, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let data = query_rows(conn, user_id, sub)?;
    if maybe_print_json(json_flag, jsonl_flag, &data)? {
        return Ok(());
    }
    let today = ctx.today();
    let rows: Vec<Vec<String>> = data
        .iter()
        .map(|p| {
            let state = if p.paid {
                "paid"
            } else if p.due_date < today {
                "OVERDUE"
            } else {
                "open"
            };
            vec![
                p.id.to_string(),
                p.due_date.to_string(),
                p.description.clone(),
                p.category.clone(),
                fmt_brl(&p.amount),
                state.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "Due", "Description", "Category", "Amount", "State"], rows)
    );
    println!(
        "Open: {}  Overdue: {}",
        fmt_brl(&sum_where(&data, |p| !p.paid)),
        fmt_brl(&sum_where(&data, |p| !p.paid && p.due_date < today))
    );
    Ok(())
}
