// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate};
use gestaomei::clock::{Clock, FixedClock};
use gestaomei::commands::{Ctx, account, notifications};
use gestaomei::config::FiscalConfig;
use gestaomei::error::MeiError;
use gestaomei::models::SubscriptionStatus;
use gestaomei::{auth, cli, db, store};
use rusqlite::Connection;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn run(conn: &Connection, ctx: &Ctx<'_>, args: &[&str]) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from(args);
    match matches.subcommand() {
        Some(("account", sub)) => account::handle(conn, ctx, sub),
        Some(("notifications", sub)) => notifications::handle(conn, sub),
        _ => panic!("unexpected command"),
    }
}

#[test]
fn signup_starts_a_trial_and_login_opens_a_session() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 6, 1));
    let ctx = Ctx::new(&fiscal, &clock);
    let conn = open();

    run(&conn, &ctx, &["gestaomei", "account", "signup", "--name", "Ana", "--email", "Ana@Example.com", "--password", "segredo123"]).unwrap();
    assert!(matches!(
        auth::current_user(&conn),
        Err(MeiError::Unauthorized(_))
    ));

    run(&conn, &ctx, &["gestaomei", "account", "login", "--email", "ana@example.com", "--password", "segredo123"]).unwrap();
    let st = account::current_status(&conn, &ctx).unwrap();
    assert_eq!(st.user.email, "ana@example.com");
    assert_eq!(st.user.subscription_status, SubscriptionStatus::Trial);
    assert_eq!(st.user.trial_expires_at, clock.now() + Duration::days(2));
    assert_eq!(st.trial_days_left, Some(2));
    assert!(st.has_access);
    assert!(!st.user.password_hash.contains("segredo123"));

    run(&conn, &ctx, &["gestaomei", "account", "logout"]).unwrap();
    assert!(account::current_status(&conn, &ctx).is_err());
}

#[test]
fn duplicate_email_and_bad_credentials_are_rejected() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 6, 1));
    let ctx = Ctx::new(&fiscal, &clock);
    let conn = open();
    auth::signup(&conn, &fiscal, &clock, "Ana", "ana@example.com", "segredo123").unwrap();

    let dup = auth::signup(&conn, &fiscal, &clock, "Outra", "ANA@example.com", "segredo456");
    assert!(matches!(dup, Err(MeiError::Validation(_))));
    assert!(matches!(
        auth::signup(&conn, &fiscal, &clock, "Curta", "curta@example.com", "123"),
        Err(MeiError::Validation(_))
    ));

    for (email, password) in [("ana@example.com", "errada"), ("nobody@example.com", "segredo123")] {
        let err = auth::login(&conn, email, password).unwrap_err();
        assert_eq!(err.to_string(), MeiError::Unauthorized("invalid email or password".into()).to_string());
    }
    assert!(run(&conn, &ctx, &["gestaomei", "account", "status"]).is_err());
}

#[test]
fn status_reports_expiry_without_blocking() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let signup = FixedClock::on(day(2024, 6, 1));
    let conn = open();
    auth::signup(&conn, &fiscal, &signup, "Ana", "ana@example.com", "segredo123").unwrap();
    auth::login(&conn, "ana@example.com", "segredo123").unwrap();

    let later = FixedClock::on(day(2024, 6, 5));
    let st = account::current_status(&conn, &Ctx::new(&fiscal, &later)).unwrap();
    assert_eq!(st.user.subscription_status, SubscriptionStatus::Expired);
    assert_eq!(st.trial_days_left, None);
    assert!(!st.has_access);
}

#[test]
fn notification_settings_default_then_persist() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 6, 1));
    let ctx = Ctx::new(&fiscal, &clock);
    let conn = open();
    auth::signup(&conn, &fiscal, &clock, "Ana", "ana@example.com", "segredo123").unwrap();
    let user = auth::login(&conn, "ana@example.com", "segredo123").unwrap();

    let defaults = store::get_notification_settings(&conn, &user).unwrap();
    assert_eq!(defaults.lead_days, 3);
    assert!(defaults.weekly_report_enabled);
    assert_eq!(defaults.notification_email, "ana@example.com");

    run(&conn, &ctx, &["gestaomei", "notifications", "set", "--lead-days", "5", "--weekly-report", "false", "--email", "fin@example.com"]).unwrap();
    let saved = store::get_notification_settings(&conn, &user).unwrap();
    assert_eq!(saved.lead_days, 5);
    assert!(!saved.weekly_report_enabled);
    assert!(saved.upcoming_due_enabled);
    assert_eq!(saved.notification_email, "fin@example.com");

    assert!(run(&conn, &ctx, &["gestaomei", "notifications", "set", "--lead-days", "4"]).is_err());
    assert!(run(&conn, &ctx, &["gestaomei", "notifications", "set", "--email", "not-an-email"]).is_err());
    assert_eq!(store::get_notification_settings(&conn, &user).unwrap(), saved);
}
