// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;
use tracing::warn;

use super::{Ctx, date_or_today, ledger_user, list_filter, output_flags, required, required_id};
use crate::aggregate::sum_where;
use crate::models::{INCOME_CATEGORIES, IncomeEntry, NewEntry};
use crate::store::{self, LedgerFilter, LedgerTable};
use crate::utils::{fmt_brl, maybe_print_json, parse_decimal, pretty_table, yes_no};

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, ctx, sub)?,
        Some(("list", sub)) => list(conn, ctx, sub)?,
        Some(("toggle", sub)) => toggle(conn, ctx, sub)?,
        Some(("rm", sub)) => {
            let user = ledger_user(conn, ctx)?;
            let id = required_id(sub)?;
            store::delete(conn, LedgerTable::Income, user.id, id)?;
            println!("Deleted income #{}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let entry = NewEntry {
        description: required(sub, "description")?.to_string(),
        amount: parse_decimal(required(sub, "amount")?)?,
        date: date_or_today(sub, "date", ctx)?,
        category: required(sub, "category")?.to_string(),
        settled: sub.get_flag("settled"),
    };
    if !INCOME_CATEGORIES.contains(&entry.category.as_str()) {
        warn!(category = %entry.category, "income category outside the standard list");
    }
    let id = store::insert_income(conn, user.id, &entry, ctx.today())?;
    println!(
        "Recorded income #{}: {} on {} ({})",
        id,
        fmt_brl(&entry.amount),
        entry.date,
        entry.description.trim()
    );
    Ok(())
}

/// Income rows matching the list flags, newest first.
pub fn query_rows(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<Vec<IncomeEntry>> {
    let filter = list_filter(sub, user_id)?;
    let mut rows = store::query_income(conn, &filter)?;
    if let Some(cat) = sub.get_one::<String>("category") {
        rows.retain(|e| e.category.eq_ignore_ascii_case(cat));
    }
    rows.reverse();
    Ok(rows)
}

fn list(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let (json_flag, jsonl_flag) = output_flags(sub);
    let data = query_rows(conn, user.id, sub)?;
    if maybe_print_json(json_flag, jsonl_flag, &data)? {
        return Ok(());
    }
    let rows: Vec<Vec<String>> = data
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.date.to_string(),
                e.description.clone(),
                e.category.clone(),
                fmt_brl(&e.amount),
                yes_no(e.received),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Date", "Description", "Category", "Amount", "Received"],
            rows
        )
    );
    println!(
        "Received: {}  Pending: {}",
        fmt_brl(&sum_where(&data, |e| e.received)),
        fmt_brl(&sum_where(&data, |e| !e.received))
    );
    Ok(())
}

fn toggle(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let id = required_id(sub)?;
    let Some(entry) = store::query_income(conn, &LedgerFilter::user(user.id))?
        .into_iter()
        .find(|e| e.id == id)
    else {
        bail!("Income #{} not found", id);
    };
    store::set_income_received(conn, user.id, id, !entry.received, ctx.today())?;
    println!(
        "Income #{} marked {}",
        id,
        if entry.received { "pending" } else { "received" }
    );
    Ok(())
}
