// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use super::{Ctx, ledger_user, output_flags, required};
use crate::aggregate::total;
use crate::das::{self, DasQuote, RevenueSource};
use crate::models::{ActivityCategory, DateRange};
use crate::store::{self, LedgerFilter};
use crate::utils::{fmt_brl, fmt_pct, maybe_print_json, parse_decimal, pretty_table};

#[derive(Debug, Serialize)]
pub struct DasView {
    #[serde(flatten)]
    pub quote: DasQuote,
    pub next_due: NaiveDate,
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("calc", sub)) => calc(conn, ctx, sub),
        _ => Ok(()),
    }
}

/// Quote for the current fiscal year. Revenue comes from `--estimate` when
/// given, else from the year's income entries.
pub fn quote(
    conn: &Connection,
    ctx: &Ctx<'_>,
    user_id: i64,
    sub: &clap::ArgMatches,
) -> Result<DasView> {
    let category: ActivityCategory = required(sub, "category")?.parse()?;
    let today = ctx.today();
    let table = ctx.fiscal.table_for(today.year())?;
    let source = match sub.get_one::<String>("estimate") {
        Some(s) => RevenueSource::Estimate(parse_decimal(s)?),
        None => {
            let year = DateRange::year_of(today);
            let income = store::query_income(conn, &LedgerFilter::user(user_id).within(year))?;
            RevenueSource::Aggregated(total(&income))
        }
    };
    let quote = das::compute(table, category, source)?;
    Ok(DasView {
        quote,
        next_due: das::next_due_date(today, table.das_due_day),
    })
}

fn calc(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let view = quote(conn, ctx, user.id, sub)?;
    if sub.get_flag("share") {
        println!("{}", view.quote.summary_text());
        return Ok(());
    }
    let (json_flag, jsonl_flag) = output_flags(sub);
    if maybe_print_json(json_flag, jsonl_flag, &view)? {
        return Ok(());
    }
    let q = &view.quote;
    let basis = match q.revenue_base {
        RevenueSource::Aggregated(_) => "recorded income",
        RevenueSource::Estimate(_) => "estimate",
    };
    let rows = vec![
        vec!["Fiscal year".into(), q.fiscal_year.to_string()],
        vec!["Category".into(), q.category.label().to_string()],
        vec!["Monthly DAS".into(), fmt_brl(&q.monthly)],
        vec!["Annual DAS".into(), fmt_brl(&q.annual)],
        vec![
            format!("Revenue ({})", basis),
            fmt_brl(&q.revenue_base.value()),
        ],
        vec!["Effective rate".into(), fmt_pct(&q.effective_rate, 2)],
        vec![
            "MEI limit".into(),
            format!(
                "{} used, {} remaining [{}]",
                fmt_pct(&q.limit.percentage_used, 1),
                fmt_brl(&q.limit.remaining),
                q.limit.status
            ),
        ],
        vec!["Next due date".into(), view.next_due.to_string()],
    ];
    println!("{}", pretty_table(&["DAS", "Value"], rows));
    Ok(())
}
