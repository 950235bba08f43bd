// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate};
use gestaomei::clock::{Clock, FixedClock};
use gestaomei::commands::{Ctx, income};
use gestaomei::config::FiscalConfig;
use gestaomei::error::MeiError;
use gestaomei::models::SubscriptionStatus;
use gestaomei::subscription::{self, WebhookOutcome, sign};
use gestaomei::{auth, cli, db, store};
use rusqlite::Connection;
use serde_json::json;

const SECRET: &str = "whsec_test";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup(fiscal: &FiscalConfig, clock: &FixedClock) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    auth::signup(&conn, fiscal, clock, "Ana", "ana@example.com", "segredo123").unwrap();
    auth::login(&conn, "ana@example.com", "segredo123").unwrap();
    conn
}

fn payload(webhook_id: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "email": "ANA@example.com",
        "status": status,
        "subscription_id": "sub_123",
        "webhook_id": webhook_id
    }))
    .unwrap()
}

fn deliver(conn: &mut Connection, body: &[u8], clock: &FixedClock) -> Result<WebhookOutcome, MeiError> {
    let sig = sign(SECRET, body);
    subscription::process_webhook(conn, SECRET, body, &sig, clock.now())
}

fn list_income(conn: &Connection, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from(["gestaomei", "income", "list"]);
    let Some(("income", sub)) = matches.subcommand() else {
        panic!("no income subcommand");
    };
    income::handle(conn, ctx, sub)
}

#[test]
fn approved_payment_activates_and_is_idempotent() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 5, 1));
    let mut conn = setup(&fiscal, &clock);

    let body = payload("evt_1", "approved");
    let outcome = deliver(&mut conn, &body, &clock).unwrap();
    let user = store::find_user_by_email(&conn, "ana@example.com").unwrap().unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Applied {
            user_id: user.id,
            status: SubscriptionStatus::Active
        }
    );
    assert_eq!(user.subscription_status, SubscriptionStatus::Active);
    assert_eq!(user.last_charge_date, Some(clock.now()));
    assert_eq!(user.subscription_id.as_deref(), Some("sub_123"));

    // same event delivered twice: no second charge recorded
    let later = FixedClock(clock.now() + Duration::days(3));
    assert_eq!(deliver(&mut conn, &body, &later).unwrap(), WebhookOutcome::Duplicate);
    let user = store::get_user(&conn, user.id).unwrap();
    assert_eq!(user.last_charge_date, Some(clock.now()));
}

#[test]
fn bad_signatures_and_unknown_users_change_nothing() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 5, 1));
    let mut conn = setup(&fiscal, &clock);

    let body = payload("evt_2", "approved");
    let forged = sign("not-the-secret", &body);
    let err = subscription::process_webhook(&mut conn, SECRET, &body, &forged, clock.now()).unwrap_err();
    assert!(matches!(err, MeiError::Unauthorized(_)));

    let stranger = serde_json::to_vec(&json!({
        "email": "ghost@example.com", "status": "approved", "webhook_id": "evt_3"
    }))
    .unwrap();
    assert!(matches!(deliver(&mut conn, &stranger, &clock), Err(MeiError::NotFound(_))));

    let user = auth::current_user(&conn).unwrap();
    assert_eq!(user.subscription_status, SubscriptionStatus::Trial);
    // the rejected delivery did not consume the event id
    assert!(matches!(
        deliver(&mut conn, &body, &clock).unwrap(),
        WebhookOutcome::Applied { .. }
    ));
}

#[test]
fn cancel_blocks_ledger_until_paid_again() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 5, 1));
    let ctx = Ctx::new(&fiscal, &clock);
    let mut conn = setup(&fiscal, &clock);

    deliver(&mut conn, &payload("evt_a", "approved"), &clock).unwrap();
    deliver(&mut conn, &payload("evt_b", "cancelled"), &clock).unwrap();
    assert_eq!(
        auth::current_user(&conn).unwrap().subscription_status,
        SubscriptionStatus::Canceled
    );
    let err = list_income(&conn, &ctx).unwrap_err();
    assert!(matches!(err.downcast_ref::<MeiError>(), Some(MeiError::Unauthorized(_))));

    // statuses the app does not act on are acknowledged and ignored
    assert_eq!(
        deliver(&mut conn, &payload("evt_c", "pending"), &clock).unwrap(),
        WebhookOutcome::Ignored("pending".into())
    );

    deliver(&mut conn, &payload("evt_d", "approved"), &clock).unwrap();
    list_income(&conn, &ctx).unwrap();
}

#[test]
fn elapsed_trial_expires_and_cannot_be_paid_back() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let signup = FixedClock::on(day(2024, 5, 1));
    let mut conn = setup(&fiscal, &signup);

    let still_trial = FixedClock(signup.now() + Duration::hours(47));
    list_income(&conn, &Ctx::new(&fiscal, &still_trial)).unwrap();

    let after = FixedClock(signup.now() + Duration::days(2));
    let err = list_income(&conn, &Ctx::new(&fiscal, &after)).unwrap_err();
    assert!(matches!(err.downcast_ref::<MeiError>(), Some(MeiError::Unauthorized(_))));
    assert_eq!(
        auth::current_user(&conn).unwrap().subscription_status,
        SubscriptionStatus::Expired
    );

    let err = deliver(&mut conn, &payload("evt_late", "approved"), &after).unwrap_err();
    assert!(matches!(
        err,
        MeiError::InvalidTransition {
            from: SubscriptionStatus::Expired,
            ..
        }
    ));
}

#[test]
fn expire_check_sweeps_only_elapsed_trials() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let early = FixedClock::on(day(2024, 5, 1));
    let conn = setup(&fiscal, &early);
    let late = FixedClock::on(day(2024, 5, 3));
    auth::signup(&conn, &fiscal, &late, "Bia", "bia@example.com", "outrasenha").unwrap();

    let now = FixedClock::on(day(2024, 5, 4)).now();
    assert_eq!(subscription::expire_overdue_trials(&conn, now).unwrap(), 1);
    assert_eq!(subscription::expire_overdue_trials(&conn, now).unwrap(), 0);
    let bia = store::find_user_by_email(&conn, "bia@example.com").unwrap().unwrap();
    assert_eq!(bia.subscription_status, SubscriptionStatus::Trial);
}
