// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};

use gestaomei::clock::SystemClock;
use gestaomei::commands::{self, Ctx};
use gestaomei::config::FiscalConfig;
use gestaomei::{cli, db, logging};

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;
    let fiscal = FiscalConfig::load().context("Load fiscal configuration")?;
    let clock = SystemClock;
    let ctx = Ctx::new(&fiscal, &clock);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("account", sub)) => commands::account::handle(&conn, &ctx, sub)?,
        Some(("income", sub)) => commands::income::handle(&conn, &ctx, sub)?,
        Some(("expense", sub)) => commands::expenses::handle(&conn, &ctx, sub)?,
        Some(("payable", sub)) => commands::payables::handle(&conn, &ctx, sub)?,
        Some(("receivable", sub)) => commands::receivables::handle(&conn, &ctx, sub)?,
        Some(("dashboard", sub)) => commands::dashboard::handle(&conn, &ctx, sub)?,
        Some(("das", sub)) => commands::das::handle(&conn, &ctx, sub)?,
        Some(("alerts", sub)) => commands::alerts::handle(&conn, &ctx, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, &ctx, sub)?,
        Some(("backup", sub)) => commands::backup::handle(&conn, &ctx, sub)?,
        Some(("subscription", sub)) => commands::subscription::handle(&mut conn, &ctx, sub)?,
        Some(("notifications", sub)) => commands::notifications::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
