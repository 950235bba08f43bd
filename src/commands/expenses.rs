// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;
use tracing::warn;

use super::{Ctx, date_or_today, ledger_user, list_filter, output_flags, required, required_id};
use crate::aggregate::{by_category, sum_where};
use crate::models::{EXPENSE_CATEGORIES, ExpenseEntry, NewEntry};
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
            store::delete(conn, LedgerTable::Expenses, user.id, id)?;
            println!("Deleted expense #{}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let category = required(sub, "category")?;
    if !EXPENSE_CATEGORIES.contains(&category) {
        warn!(category, "expense category outside the standard list");
    }
    let entry = NewEntry {
        description: required(sub, "description")?.to_string(),
        amount: parse_decimal(required(sub, "amount")?)?,
        date: date_or_today(sub, "date", ctx)?,
        category: category.to_string(),
        settled: sub.get_flag("settled"),
    };
    let id = store::insert_expense(conn, user.id, &entry, ctx.today())?;
    println!(
        "Recorded expense #{}: {} on {} ({})",
        id,
        fmt_brl(&entry.amount),
        entry.date,
        entry.description.trim()
    );
    Ok(())
}

pub fn query_rows(
    conn: &Connection,
    user_id: i64,
    sub: &clap::ArgMatches,
) -> Result<Vec<ExpenseEntry>> {
    let filter = list_filter(sub, user_id)?;
    let mut rows = store::query_expenses(conn, &filter)?;
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
                yes_no(e.paid),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Date", "Description", "Category", "Amount", "Paid"],
            rows
        )
    );
    println!(
        "Paid: {}  Pending: {}",
        fmt_brl(&sum_where(&data, |e| e.paid)),
        fmt_brl(&sum_where(&data, |e| !e.paid))
    );
    let top = by_category(&data, |e| e.category.as_str());
    if let Some((cat, amount)) = top.first() {
        println!("Largest category: {} ({})", cat, fmt_brl(amount));
    }
    Ok(())
}

fn toggle(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let id = required_id(sub)?;
    let current = store::query_expenses(conn, &LedgerFilter::user(user.id))?
        .into_iter()
        .find(|e| e.id == id);
    let Some(entry) = current else {
        bail!("Expense #{} not found", id);
    };
    store::set_expense_paid(conn, user.id, id, !entry.paid, ctx.today())?;
    println!(
        "Expense #{} marked {}",
        id,
        if entry.paid { "pending" } else { "paid" }
    );
    Ok(())
}
