// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Ctx, ledger_user, output_flags};
use crate::alerts::{self, Alert, AlertSession};
use crate::mei_limit;
use crate::models::UserAccount;
use crate::utils::{fmt_brl, fmt_pct, maybe_print_json, pretty_table};

#[derive(Debug, Serialize)]
pub struct AlertsView {
    pub alerts: Vec<Alert>,
    pub annual_revenue: Decimal,
    pub remaining_limit: Decimal,
    pub percentage_used: Decimal,
    pub payables_due: Decimal,
    pub receivables_due: Decimal,
}

/// Alerts for `user` minus those dismissed in `session`, plus the MEI
/// summary shown next to them.
pub fn build(
    conn: &Connection,
    ctx: &Ctx<'_>,
    user: &UserAccount,
    session: &AlertSession,
) -> Result<AlertsView> {
    let context = alerts::load_context(conn, user, ctx.fiscal, ctx.clock)?;
    let all = alerts::generate(&context)?;
    let limit = mei_limit::evaluate_for(context.annual_revenue, &context.fiscal)?;
    let (payables_due, receivables_due) = alerts::upcoming_totals(&context);
    Ok(AlertsView {
        alerts: session.visible(&all).into_iter().cloned().collect(),
        annual_revenue: context.annual_revenue,
        remaining_limit: limit.remaining,
        percentage_used: limit.percentage_used,
        payables_due,
        receivables_due,
    })
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let mut session = AlertSession::new();
    if let Some(ids) = m.get_many::<String>("dismiss") {
        for id in ids {
            session.dismiss(id.as_str());
        }
    }
    let view = build(conn, ctx, &user, &session)?;

    let (json_flag, jsonl_flag) = output_flags(m);
    if maybe_print_json(json_flag, jsonl_flag, &view)? {
        return Ok(());
    }
    if view.alerts.is_empty() {
        println!("No alerts.");
    } else {
        let rows = view
            .alerts
            .iter()
            .map(|a| {
                vec![
                    a.id.clone(),
                    a.priority.to_string(),
                    a.title.clone(),
                    a.message.clone(),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["ID", "Priority", "Alert", "Details"], rows));
    }
    println!(
        "Annual revenue: {} ({} of the MEI limit), remaining: {}",
        fmt_brl(&view.annual_revenue),
        fmt_pct(&view.percentage_used, 1),
        fmt_brl(&view.remaining_limit)
    );
    println!(
        "Due soon: {} to pay, {} to receive",
        fmt_brl(&view.payables_due),
        fmt_brl(&view.receivables_due)
    );
    Ok(())
}
