// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod account;
pub mod alerts;
pub mod backup;
pub mod das;
pub mod dashboard;
pub mod expenses;
pub mod income;
pub mod notifications;
pub mod payables;
pub mod receivables;
pub mod reports;
pub mod subscription;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::auth;
use crate::clock::Clock;
use crate::config::FiscalConfig;
use crate::models::{DateRange, UserAccount};
use crate::store::LedgerFilter;
use crate::subscription::ensure_access;
use crate::utils::{parse_date, parse_month};

/// What every handler needs besides the connection.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    pub fiscal: &'a FiscalConfig,
    pub clock: &'a dyn Clock,
}

impl<'a> Ctx<'a> {
    pub fn new(fiscal: &'a FiscalConfig, clock: &'a dyn Clock) -> Self {
        Self { fiscal, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// The logged-in user, without the subscription gate.
pub fn session_user(conn: &Connection) -> Result<UserAccount> {
    Ok(auth::current_user(conn)?)
}

/// The logged-in user, provided the subscription still grants access.
pub fn ledger_user(conn: &Connection, ctx: &Ctx<'_>) -> Result<UserAccount> {
    let user = session_user(conn)?;
    Ok(ensure_access(conn, user, ctx.clock.now())?)
}

pub(crate) fn required<'m>(m: &'m clap::ArgMatches, name: &str) -> Result<&'m str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{} is required", name))
}

pub(crate) fn required_id(m: &clap::ArgMatches) -> Result<i64> {
    m.get_one::<i64>("id").copied().context("record id is required")
}

pub(crate) fn date_or_today(m: &clap::ArgMatches, name: &str, ctx: &Ctx<'_>) -> Result<NaiveDate> {
    match m.get_one::<String>(name) {
        Some(s) => parse_date(s),
        None => Ok(ctx.today()),
    }
}

/// Builds the store filter from `--month` and `--status` on a list command.
pub(crate) fn list_filter(m: &clap::ArgMatches, user_id: i64) -> Result<LedgerFilter> {
    let mut filter = LedgerFilter::user(user_id);
    if let Some(month) = m.get_one::<String>("month") {
        filter = filter.within(parse_month(month)?);
    }
    if let Some(status) = m.get_one::<String>("status") {
        filter = filter.flagged(status != "pending");
    }
    Ok(filter)
}

/// `--from`/`--to`, defaulting to January 1st of the current year through today.
pub(crate) fn period(m: &clap::ArgMatches, ctx: &Ctx<'_>) -> Result<DateRange> {
    let today = ctx.today();
    let from = match m.get_one::<String>("from") {
        Some(s) => parse_date(s)?,
        None => DateRange::year_of(today).start,
    };
    let to = date_or_today(m, "to", ctx)?;
    Ok(DateRange::new(from, to)?)
}

pub(crate) fn output_flags(m: &clap::ArgMatches) -> (bool, bool) {
    (m.get_flag("json"), m.get_flag("jsonl"))
}
