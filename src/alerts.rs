// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Dashboard alerts.
//!
//! Alerts are recomputed from the ledger on every request and never stored.
//! Each rule is a standalone function so it can be evaluated on its own;
//! [`generate`] runs them in display order.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::aggregate::{self, sum_in_range};
use crate::clock::Clock;
use crate::config::{FiscalConfig, FiscalTable};
use crate::error::MeiResult;
use crate::mei_limit::{self, LimitStatus};
use crate::models::{DateRange, Payable, Receivable, SubscriptionStatus, UserAccount};
use crate::store::{self, LedgerFilter};
use crate::subscription::days_remaining;
use crate::utils::{fmt_brl, fmt_pct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    TaxDue,
    RevenueLimit,
    DueDate,
    BackupReminder,
    TrialExpiring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    pub category: AlertCategory,
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

impl Alert {
    fn new(
        id: &str,
        category: AlertCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            title: title.into(),
            message: message.into(),
            priority,
        }
    }
}

/// Everything the rules look at.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub now: DateTime<Utc>,
    pub annual_revenue: Decimal,
    pub fiscal: FiscalTable,
    pub due_window_days: i64,
    pub backup_stale_days: i64,
    pub payables: Vec<Payable>,
    pub receivables: Vec<Receivable>,
    pub user: UserAccount,
    pub last_backup: Option<DateTime<Utc>>,
}

impl AlertContext {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn due_window(&self) -> DateRange {
        DateRange::days_from(self.today(), self.due_window_days)
    }
}

/// Fetches the inputs for `user`. A failed fetch fails the whole load.
pub fn load_context(
    conn: &Connection,
    user: &UserAccount,
    cfg: &FiscalConfig,
    clock: &dyn Clock,
) -> MeiResult<AlertContext> {
    let now = clock.now();
    let today = clock.today();
    let fiscal = cfg.table_for(chrono::Datelike::year(&today))?.clone();

    let year = DateRange::year_of(today);
    let income = store::query_income(conn, &LedgerFilter::user(user.id).within(year))?;
    let window = DateRange::days_from(today, cfg.due_window_days);
    let payables =
        store::query_payables(conn, &LedgerFilter::user(user.id).within(window).flagged(false))?;
    let receivables = store::query_receivables(
        conn,
        &LedgerFilter::user(user.id).within(window).flagged(false),
    )?;
    let last_backup = store::last_backup(conn, user.id)?;

    Ok(AlertContext {
        now,
        annual_revenue: sum_in_range(&income, &year),
        fiscal,
        due_window_days: cfg.due_window_days,
        backup_stale_days: cfg.backup_stale_days,
        payables,
        receivables,
        user: user.clone(),
        last_backup,
    })
}

pub fn revenue_limit_alert(ctx: &AlertContext) -> MeiResult<Option<Alert>> {
    let report = mei_limit::evaluate_for(ctx.annual_revenue, &ctx.fiscal)?;
    let (title, priority) = match report.status {
        LimitStatus::Within => return Ok(None),
        LimitStatus::NearLimit => ("Close to the MEI limit", Priority::Medium),
        LimitStatus::OverLimit => ("MEI limit exceeded!", Priority::High),
    };
    Ok(Some(Alert::new(
        "mei-limit",
        AlertCategory::RevenueLimit,
        title,
        format!(
            "You have used {} of the annual limit ({})",
            fmt_pct(&report.percentage_used, 1),
            fmt_brl(&report.revenue)
        ),
        priority,
    )))
}

pub fn tax_due_alert(ctx: &AlertContext) -> Option<Alert> {
    let day = chrono::Datelike::day(&ctx.today());
    let due = ctx.fiscal.das_due_day;
    if day < ctx.fiscal.das_warning_from_day || day > due {
        return None;
    }
    let (message, priority) = if day == due {
        (format!("DAS is due every day {}. Due today!", due), Priority::High)
    } else {
        (
            format!("DAS is due every day {}. {} day(s) left.", due, due - day),
            Priority::Medium,
        )
    };
    Some(Alert::new(
        "das-due",
        AlertCategory::TaxDue,
        "DAS due soon",
        message,
        priority,
    ))
}

fn due_message(count: usize, total: Decimal, window_days: i64) -> String {
    format!(
        "{} bill(s) due in the next {} days ({})",
        count,
        window_days,
        fmt_brl(&total)
    )
}

pub fn payables_due_alert(ctx: &AlertContext) -> Option<Alert> {
    let window = ctx.due_window();
    let due: Vec<&Payable> = ctx
        .payables
        .iter()
        .filter(|p| !p.paid && window.contains(p.due_date))
        .collect();
    if due.is_empty() {
        return None;
    }
    let total: Decimal = due.iter().map(|p| p.amount).sum();
    Some(Alert::new(
        "payables-due",
        AlertCategory::DueDate,
        "Bills to pay",
        due_message(due.len(), total, ctx.due_window_days),
        Priority::Medium,
    ))
}

pub fn receivables_due_alert(ctx: &AlertContext) -> Option<Alert> {
    let window = ctx.due_window();
    let due: Vec<&Receivable> = ctx
        .receivables
        .iter()
        .filter(|r| !r.received && window.contains(r.due_date))
        .collect();
    if due.is_empty() {
        return None;
    }
    let total: Decimal = due.iter().map(|r| r.amount).sum();
    Some(Alert::new(
        "receivables-due",
        AlertCategory::DueDate,
        "Bills to receive",
        due_message(due.len(), total, ctx.due_window_days),
        Priority::Medium,
    ))
}

pub fn trial_alert(ctx: &AlertContext) -> Option<Alert> {
    if ctx.user.subscription_status != SubscriptionStatus::Trial {
        return None;
    }
    let days = days_remaining(ctx.user.trial_expires_at, ctx.now);
    if days > 1 {
        return None;
    }
    let message = match days {
        1 => "Your trial expires in 1 day".to_string(),
        0 => "Your trial expires today!".to_string(),
        _ => "Your trial has expired".to_string(),
    };
    Some(Alert::new(
        "trial-expiring",
        AlertCategory::TrialExpiring,
        "Trial expiring",
        message,
        Priority::High,
    ))
}

pub fn backup_alert(ctx: &AlertContext) -> Option<Alert> {
    let stale = match ctx.last_backup {
        None => true,
        Some(at) => ctx.now > at + Duration::days(ctx.backup_stale_days),
    };
    stale.then(|| {
        Alert::new(
            "backup",
            AlertCategory::BackupReminder,
            "Backup recommended",
            "Back up your financial data regularly",
            Priority::Low,
        )
    })
}

/// Runs every rule in display order.
pub fn generate(ctx: &AlertContext) -> MeiResult<Vec<Alert>> {
    let mut alerts = Vec::new();
    alerts.extend(revenue_limit_alert(ctx)?);
    alerts.extend(tax_due_alert(ctx));
    alerts.extend(payables_due_alert(ctx));
    alerts.extend(receivables_due_alert(ctx));
    alerts.extend(trial_alert(ctx));
    alerts.extend(backup_alert(ctx));
    tracing::debug!(user_id = ctx.user.id, count = alerts.len(), "alerts generated");
    Ok(alerts)
}

pub fn generate_for_user(
    conn: &Connection,
    user: &UserAccount,
    cfg: &FiscalConfig,
    clock: &dyn Clock,
) -> MeiResult<Vec<Alert>> {
    let ctx = load_context(conn, user, cfg, clock)?;
    generate(&ctx)
}

/// Alerts dismissed during one session. Dismissal hides an alert until the
/// session ends; regenerating alerts does not bring it back within the
/// session, and nothing is written to the store.
#[derive(Debug, Default, Clone)]
pub struct AlertSession {
    dismissed: HashSet<String>,
}

impl AlertSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dismiss(&mut self, id: impl Into<String>) {
        self.dismissed.insert(id.into());
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed.contains(id)
    }

    pub fn visible<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| !self.is_dismissed(&a.id)).collect()
    }
}

/// Open payables and receivables due within the window, totalled per direction.
pub fn upcoming_totals(ctx: &AlertContext) -> (Decimal, Decimal) {
    let window = ctx.due_window();
    (
        aggregate::sum_in_range(&ctx.payables, &window),
        aggregate::sum_in_range(&ctx.receivables, &window),
    )
}
