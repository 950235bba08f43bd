// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::{Ctx, ledger_user, required};
use crate::models::{ExpenseEntry, IncomeEntry, Payable, Receivable, UserAccount};
use crate::store::{self, LedgerFilter};

#[derive(Debug, Serialize)]
pub struct BackupHeader {
    pub name: String,
    pub email: String,
    pub backup_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Backup {
    pub user: BackupHeader,
    pub income: Vec<IncomeEntry>,
    pub expenses: Vec<ExpenseEntry>,
    pub payables: Vec<Payable>,
    pub receivables: Vec<Receivable>,
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    let user = ledger_user(conn, ctx)?;
    let out = required(m, "out")?;
    let backup = write_backup(conn, &user, ctx.clock.now(), Path::new(out))?;
    println!(
        "Backup written to {} ({} income, {} expenses, {} payables, {} receivables)",
        out,
        backup.income.len(),
        backup.expenses.len(),
        backup.payables.len(),
        backup.receivables.len()
    );
    Ok(())
}

/// Dumps every record of `user` to `path` and stamps the backup time.
pub fn write_backup(
    conn: &Connection,
    user: &UserAccount,
    now: DateTime<Utc>,
    path: &Path,
) -> Result<Backup> {
    let all = LedgerFilter::user(user.id);
    let backup = Backup {
        user: BackupHeader {
            name: user.name.clone(),
            email: user.email.clone(),
            backup_at: now,
        },
        income: store::query_income(conn, &all)?,
        expenses: store::query_expenses(conn, &all)?,
        payables: store::query_payables(conn, &all)?,
        receivables: store::query_receivables(conn, &all)?,
    };
    std::fs::write(path, serde_json::to_string_pretty(&backup)?)
        .with_context(|| format!("Write backup to {}", path.display()))?;
    store::record_backup(conn, user.id, now)?;
    info!(user_id = user.id, path = %path.display(), "backup written");
    Ok(backup)
}
