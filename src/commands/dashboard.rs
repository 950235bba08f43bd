// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Datelike, Months};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Ctx, ledger_user, output_flags};
use crate::aggregate::{
    MonthBreakdown, MonthPoint, MonthlySummary, by_category, month_breakdown,
    monthly_series, monthly_summary,
};
use crate::mei_limit::{self, LimitReport};
use crate::models::{DateRange, ExpenseEntry, IncomeEntry, Payable, Receivable};
use crate::store::{self, LedgerFilter};
use crate::utils::{fmt_brl, fmt_pct, maybe_print_json, parse_month, pretty_table};

const SERIES_MONTHS: usize = 6;
const UPCOMING_SHOWN: usize = 5;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub month: DateRange,
    pub fiscal_year: i32,
    pub summary: MonthlySummary,
    pub breakdown: MonthBreakdown,
    pub limit: LimitReport,
    pub series: Vec<MonthPoint>,
    pub income_by_category: Vec<(String, Decimal)>,
    /// Open items due between today and one month ahead, soonest first.
    pub upcoming_payables: Vec<Payable>,
    pub upcoming_receivables: Vec<Receivable>,
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let month = match m.get_one::<String>("month") {
        Some(s) => parse_month(s)?,
        None => DateRange::month_of(ctx.today()),
    };
    let dash = build(conn, ctx, user.id, month)?;
    let (json_flag, jsonl_flag) = output_flags(m);
    if maybe_print_json(json_flag, jsonl_flag, &dash)? {
        return Ok(());
    }
    print(&dash);
    Ok(())
}

/// Everything the dashboard shows for `month`. The reference day is today
/// when `month` is the current month, otherwise its last day.
pub fn build(conn: &Connection, ctx: &Ctx<'_>, user_id: i64, month: DateRange) -> Result<Dashboard> {
    let today = ctx.today();
    let reference = if month.contains(today) { today } else { month.end };

    let mut series_start = month;
    for _ in 1..SERIES_MONTHS {
        series_start = DateRange::previous_month_of(series_start.start);
    }
    let year = DateRange::year_of(reference);
    let fetch = DateRange::new(series_start.start.min(year.start), month.end.max(year.end))?;

    let income = store::query_income(conn, &LedgerFilter::user(user_id).within(fetch))?;
    let expenses = store::query_expenses(conn, &LedgerFilter::user(user_id).within(fetch))?;
    let open_payables = store::query_payables(conn, &LedgerFilter::user(user_id).flagged(false))?;
    let open_receivables =
        store::query_receivables(conn, &LedgerFilter::user(user_id).flagged(false))?;
    let horizon = today.checked_add_months(Months::new(1)).unwrap_or(today);
    let upcoming = DateRange::new(today, horizon)?;
    let upcoming_payables: Vec<Payable> = open_payables
        .iter()
        .filter(|p| upcoming.contains(p.due_date))
        .cloned()
        .collect();
    let upcoming_receivables: Vec<Receivable> = open_receivables
        .iter()
        .filter(|r| upcoming.contains(r.due_date))
        .cloned()
        .collect();

    let month_income: Vec<IncomeEntry> = income
        .iter()
        .filter(|e| month.contains(e.date))
        .cloned()
        .collect();
    let month_expenses: Vec<ExpenseEntry> = expenses
        .iter()
        .filter(|e| month.contains(e.date))
        .cloned()
        .collect();

    let summary = monthly_summary(&income, &expenses, reference);
    let table = ctx.fiscal.table_for(reference.year())?;
    let limit = mei_limit::evaluate_for(summary.annual_revenue, table)?;

    Ok(Dashboard {
        month,
        fiscal_year: table.year,
        breakdown: month_breakdown(&month_income, &month_expenses, &open_payables, &open_receivables),
        limit,
        series: monthly_series(&income, &expenses, month.end, SERIES_MONTHS),
        income_by_category: by_category(&month_income, |e| e.category.as_str()),
        summary,
        upcoming_payables,
        upcoming_receivables,
    })
}

fn print(d: &Dashboard) {
    let b = &d.breakdown;
    let s = &d.summary;
    println!("Month {}", d.month);
    println!(
        "{}",
        pretty_table(
            &["", "Total", "Settled", "Pending", "vs last month"],
            vec![
                vec![
                    "Revenue".into(),
                    fmt_brl(&b.total_income),
                    fmt_brl(&b.income_received),
                    fmt_brl(&b.income_pending),
                    fmt_pct(&s.revenue_change, 1),
                ],
                vec![
                    "Expenses".into(),
                    fmt_brl(&b.total_expense),
                    fmt_brl(&b.expense_paid),
                    fmt_brl(&b.expense_pending),
                    fmt_pct(&s.expense_change, 1),
                ],
            ],
        )
    );
    println!("Balance: {}  Profit: {}", fmt_brl(&b.balance), fmt_brl(&s.profit));
    println!(
        "Open payables: {}  Open receivables: {}",
        fmt_brl(&b.open_payables),
        fmt_brl(&b.open_receivables)
    );
    println!(
        "MEI limit {}: {} of {} used ({}), {} remaining [{}]",
        d.fiscal_year,
        fmt_brl(&d.limit.revenue),
        fmt_brl(&d.limit.ceiling),
        fmt_pct(&d.limit.percentage_used, 1),
        fmt_brl(&d.limit.remaining),
        d.limit.status
    );

    let rows = d
        .series
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
    println!("{}", pretty_table(&["Month", "Revenue", "Expenses", "Balance"], rows));

    if !d.income_by_category.is_empty() {
        let total = d.breakdown.total_income;
        let rows = d
            .income_by_category
            .iter()
            .map(|(cat, amount)| {
                let share = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    *amount / total * Decimal::ONE_HUNDRED
                };
                vec![cat.clone(), fmt_brl(amount), fmt_pct(&share, 1)]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Revenue", "Share"], rows));
    }

    print_upcoming(
        "Payables due within a month",
        d.upcoming_payables
            .iter()
            .map(|p| (p.due_date, &p.description, &p.amount)),
    );
    print_upcoming(
        "Receivables due within a month",
        d.upcoming_receivables
            .iter()
            .map(|r| (r.due_date, &r.description, &r.amount)),
    );
}

fn print_upcoming<'a>(
    title: &str,
    items: impl ExactSizeIterator<Item = (chrono::NaiveDate, &'a String, &'a Decimal)>,
) {
    let count = items.len();
    if count == 0 {
        println!("{title}: none");
        return;
    }
    let rows = items
        .take(UPCOMING_SHOWN)
        .map(|(due, desc, amount)| vec![due.to_string(), desc.clone(), fmt_brl(amount)])
        .collect();
    println!("{title} ({count})");
    println!("{}", pretty_table(&["Due", "Description", "Amount"], rows));
    if count > UPCOMING_SHOWN {
        println!("... {} more, see `payable list` / `receivable list`", count - UPCOMING_SHOWN);
    }
}
