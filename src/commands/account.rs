// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use super::{Ctx, output_flags, required, session_user};
use crate::auth;
use crate::models::{SubscriptionStatus, UserAccount};
use crate::subscription::{check_trial_expiry, days_remaining};
use crate::utils::{maybe_print_json, pretty_table};

#[derive(Debug, Serialize)]
pub struct AccountStatus {
    #[serde(flatten)]
    pub user: UserAccount,
    pub has_access: bool,
    pub trial_days_left: Option<i64>,
}

pub fn handle(conn: &Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("signup", sub)) => {
            let user = auth::signup(
                conn,
                ctx.fiscal,
                ctx.clock,
                required(sub, "name")?,
                required(sub, "email")?,
                required(sub, "password")?,
            )?;
            println!(
                "Welcome, {}! Your free trial ends at {}. Log in with `gestaomei account login`.",
                user.name,
                user.trial_expires_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        Some(("login", sub)) => {
            let user = auth::login(conn, required(sub, "email")?, required(sub, "password")?)?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Some(("logout", _)) => {
            auth::logout(conn)?;
            println!("Logged out");
        }
        Some(("status", sub)) => status(conn, ctx, sub)?,
        _ => {}
    }
    Ok(())
}

/// The session user after the trial check, with access and countdown.
pub fn current_status(conn: &Connection, ctx: &Ctx<'_>) -> Result<AccountStatus> {
    let now = ctx.clock.now();
    let user = check_trial_expiry(conn, session_user(conn)?, now)?;
    let trial_days_left = (user.subscription_status == SubscriptionStatus::Trial)
        .then(|| days_remaining(user.trial_expires_at, now));
    Ok(AccountStatus {
        has_access: user.subscription_status.grants_access(),
        trial_days_left,
        user,
    })
}

fn status(conn: &Connection, ctx: &Ctx<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let st = current_status(conn, ctx)?;
    let (json_flag, jsonl_flag) = output_flags(sub);
    if maybe_print_json(json_flag, jsonl_flag, &st)? {
        return Ok(());
    }
    let u = &st.user;
    let mut rows = vec![
        vec!["Name".into(), u.name.clone()],
        vec!["Email".into(), u.email.clone()],
        vec!["Subscription".into(), u.subscription_status.to_string()],
    ];
    if let Some(days) = st.trial_days_left {
        rows.push(vec!["Trial days left".into(), days.to_string()]);
    }
    if let Some(charged) = u.last_charge_date {
        rows.push(vec!["Last charge".into(), charged.date_naive().to_string()]);
    }
    if let Some(id) = &u.subscription_id {
        rows.push(vec!["Subscription id".into(), id.clone()]);
    }
    println!("{}", pretty_table(&["Account", ""], rows));
    if !st.has_access {
        println!("Access is blocked until the subscription is renewed.");
    }
    Ok(())
}
