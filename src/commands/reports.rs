// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use chrono::Datelike;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use super::{Ctx, ledger_user, output_flags, period, required};
use crate::aggregate::{MonthPoint, by_category, monthly_series, total};
use crate::models::{DateRange, ExpenseEntry, IncomeEntry};
use crate::store::{self, LedgerFilter};
use crate::utils::{fmt_brl, maybe_print_json, pretty_table};

#[derive(Debug, Serialize)]
pub struct PeriodReport {
    pub period: DateRange,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub months: Vec<MonthPoint>,
    pub income_by_category: Vec<(String, Decimal)>,
    pub expense_by_category: Vec<(String, Decimal)>,
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    match m.subcommand() {
        Some(("export", sub)) => export(conn, ctx, user.id, sub),
        _ => summary(conn, ctx, user.id, m),
    }
}

fn entries(
    conn: &Connection,
    user_id: i64,
    range: DateRange,
) -> Result<(Vec<IncomeEntry>, Vec<ExpenseEntry>)> {
    let filter = LedgerFilter::user(user_id).within(range);
    Ok((
        store::query_income(conn, &filter)?,
        store::query_expenses(conn, &filter)?,
    ))
}

fn month_span(range: &DateRange) -> usize {
    let months = (range.end.year() - range.start.year()) * 12
        + range.end.month() as i32
        - range.start.month() as i32
        + 1;
    months.max(1) as usize
}

pub fn build(conn: &Connection, user_id: i64, range: DateRange) -> Result<PeriodReport> {
    let (income, expenses) = entries(conn, user_id, range)?;
    let total_income = total(&income);
    let total_expense = total(&expenses);
    Ok(PeriodReport {
        period: range,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        months: monthly_series(&income, &expenses, range.end, month_span(&range)),
        income_by_category: by_category(&income, |e| e.category.as_str()),
        expense_by_category: by_category(&expenses, |e| e.category.as_str()),
    })
}

fn summary(conn: &Connection, ctx: &Ctx<'_>, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    let report = build(conn, user_id, period(m, ctx)?)?;
    let (json_flag, jsonl_flag) = output_flags(m);
    if maybe_print_json(json_flag, jsonl_flag, &report)? {
        return Ok(());
    }
    println!("Report {}", report.period);
    println!(
        "Income: {}  Expenses: {}  Balance: {}",
        fmt_brl(&report.total_income),
        fmt_brl(&report.total_expense),
        fmt_brl(&report.balance)
    );
    let rows = report
        .months
        .iter()
        .map(|p| {
            vec![
                p.month.clone(),
                fmt_brl(&p.revenue),
                fmt_brl(&p.expense),
                fmt_brl(&p.balance),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Month", "Income", "Expenses", "Balance"], rows));
    for (title, items) in [
        ("Income category", &report.income_by_category),
        ("Expense category", &report.expense_by_category),
    ] {
        if items.is_empty() {
            continue;
        }
        let rows = items
            .iter()
            .map(|(c, v)| vec![c.clone(), fmt_brl(v)])
            .collect();
        println!("{}", pretty_table(&[title, "Total"], rows));
    }
    Ok(())
}

/// Writes income and expense entries of the period, oldest first.
fn export(conn: &Connection, ctx: &Ctx<'_>, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = required(sub, "format")?.to_lowercase();
    let out = required(sub, "out")?;
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }
    let range = period(sub, ctx)?;
    let (income, expenses) = entries(conn, user_id, range)?;

    let mut lines: Vec<(String, &str, String, String, String, bool)> = income
        .iter()
        .map(|e| {
            (
                e.date.to_string(),
                "income",
                e.description.clone(),
                e.category.clone(),
                e.amount.to_string(),
                e.received,
            )
        })
        .chain(expenses.iter().map(|e| {
            (
                e.date.to_string(),
                "expense",
                e.description.clone(),
                e.category.clone(),
                e.amount.to_string(),
                e.paid,
            )
        }))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)?;
        wtr.write_record(["date", "kind", "description", "category", "amount", "settled"])?;
        for (date, kind, desc, cat, amount, settled) in &lines {
            wtr.write_record([
                date.as_str(),
                *kind,
                desc.as_str(),
                cat.as_str(),
                amount.as_str(),
                if *settled { "true" } else { "false" },
            ])?;
        }
        wtr.flush()?;
    } else {
        let items: Vec<serde_json::Value> = lines
            .iter()
            .map(|(date, kind, desc, cat, amount, settled)| {
                json!({
                    "date": date, "kind": kind, "description": desc,
                    "category": cat, "amount": amount, "settled": settled
                })
            })
            .collect();
        std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
    }
    tracing::info!(rows = lines.len(), path = out, "period exported");
    println!("Exported {} entries to {}", lines.len(), out);
    Ok(())
}
