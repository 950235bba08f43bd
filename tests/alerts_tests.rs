// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, TimeZone, Utc};
use gestaomei::alerts::{self, AlertSession, Priority};
use gestaomei::clock::FixedClock;
use gestaomei::commands::{self, Ctx, backup};
use gestaomei::config::FiscalConfig;
use gestaomei::models::{NewEntry, UserAccount};
use gestaomei::{auth, cli, db, store};
use rust_decimal::Decimal;
use rusqlite::Connection;
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup(fiscal: &FiscalConfig, clock: &FixedClock) -> (Connection, UserAccount) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    auth::signup(&conn, fiscal, clock, "Ana", "ana@example.com", "segredo123").unwrap();
    let user = auth::login(&conn, "ana@example.com", "segredo123").unwrap();
    (conn, user)
}

fn income(conn: &Connection, user_id: i64, amount: i64, date: NaiveDate) {
    let entry = NewEntry {
        description: "Venda".into(),
        amount: Decimal::from(amount),
        date,
        category: "Venda Produtos".into(),
        settled: true,
    };
    store::insert_income(conn, user_id, &entry, date).unwrap();
}

fn ids(list: &[alerts::Alert]) -> Vec<&str> {
    list.iter().map(|a| a.id.as_str()).collect()
}

#[test]
fn rules_fire_from_stored_records_in_display_order() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 3, 16));
    let (conn, user) = setup(&fiscal, &clock);

    income(&conn, user.id, 70_000, day(2024, 2, 1));
    // last year's revenue does not count towards this year's ceiling
    income(&conn, user.id, 50_000, day(2023, 12, 20));
    store::insert_payable(&conn, user.id, "Fornecedor", Decimal::from(480), day(2024, 3, 18), "Fornecedores").unwrap();
    store::insert_receivable(&conn, user.id, "Cliente", Decimal::from(900), day(2024, 4, 30)).unwrap();

    let list = alerts::generate_for_user(&conn, &user, &fiscal, &clock).unwrap();
    assert_eq!(ids(&list), ["mei-limit", "das-due", "payables-due", "backup"]);
    assert_eq!(list[0].priority, Priority::Medium);
    assert_eq!(list[1].message, "DAS is due every day 20. 4 day(s) left.");
    assert!(list[2].message.contains("R$ 480,00"));
    assert_eq!(list[3].priority, Priority::Low);
}

#[test]
fn paid_payables_and_received_receivables_stay_quiet() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 3, 5));
    let (conn, user) = setup(&fiscal, &clock);

    let p = store::insert_payable(&conn, user.id, "Luz", Decimal::from(120), day(2024, 3, 7), "Água/Luz").unwrap();
    store::mark_payable_paid(&conn, user.id, p).unwrap();
    let r = store::insert_receivable(&conn, user.id, "Cliente", Decimal::from(300), day(2024, 3, 12)).unwrap();
    store::mark_receivable_received(&conn, user.id, r).unwrap();
    store::insert_receivable(&conn, user.id, "Atrasado", Decimal::from(300), day(2024, 3, 1)).unwrap();

    let list = alerts::generate_for_user(&conn, &user, &fiscal, &clock).unwrap();
    assert_eq!(ids(&list), ["backup"]);
}

#[test]
fn backup_silences_the_reminder_until_it_goes_stale() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 3, 5));
    let (conn, user) = setup(&fiscal, &clock);
    income(&conn, user.id, 1_000, day(2024, 3, 1));
    store::insert_payable(&conn, user.id, "Internet", Decimal::from(99), day(2024, 4, 1), "Internet").unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("backup.json");
    let written = backup::write_backup(&conn, &user, clock.0, &path).unwrap();
    assert_eq!(written.income.len(), 1);

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed["user"]["email"], "ana@example.com");
    assert!(parsed["user"].get("password_hash").is_none());
    assert_eq!(parsed["payables"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["receivables"].as_array().unwrap().len(), 0);

    assert_eq!(store::last_backup(&conn, user.id).unwrap(), Some(clock.0));
    let list = alerts::generate_for_user(&conn, &user, &fiscal, &clock).unwrap();
    assert!(!ids(&list).contains(&"backup"));

    let later = FixedClock::on(day(2024, 3, 13));
    let user = auth::current_user(&conn).unwrap();
    let list = alerts::generate_for_user(&conn, &user, &fiscal, &later).unwrap();
    assert!(ids(&list).contains(&"backup"));
}

#[test]
fn trial_alert_appears_on_the_last_day() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let signup = FixedClock::on(day(2024, 3, 2));
    let (conn, user) = setup(&fiscal, &signup);

    let fresh = alerts::generate_for_user(&conn, &user, &fiscal, &signup).unwrap();
    assert!(!ids(&fresh).contains(&"trial-expiring"));

    let last_day = FixedClock(Utc.with_ymd_and_hms(2024, 3, 3, 13, 0, 0).unwrap());
    let list = alerts::generate_for_user(&conn, &user, &fiscal, &last_day).unwrap();
    let trial = list.iter().find(|a| a.id == "trial-expiring").unwrap();
    assert_eq!(trial.message, "Your trial expires in 1 day");
    assert_eq!(trial.priority, Priority::High);
}

#[test]
fn dismissed_alerts_stay_hidden_for_the_session() {
    let fiscal = FiscalConfig::builtin().unwrap();
    let clock = FixedClock::on(day(2024, 3, 20));
    let (conn, user) = setup(&fiscal, &clock);
    let ctx = Ctx::new(&fiscal, &clock);

    let matches = cli::build_cli().get_matches_from([
        "gestaomei", "alerts", "--dismiss", "backup",
    ]);
    let Some(("alerts", sub)) = matches.subcommand() else {
        panic!("no alerts subcommand");
    };
    let mut session = AlertSession::new();
    for id in sub.get_many::<String>("dismiss").unwrap() {
        session.dismiss(id.as_str());
    }

    let view = commands::alerts::build(&conn, &ctx, &user, &session).unwrap();
    assert_eq!(ids(&view.alerts), ["das-due"]);
    assert_eq!(view.alerts[0].priority, Priority::High);
    assert_eq!(view.remaining_limit, Decimal::from(81_000));

    // regenerating within the same session keeps it hidden
    let again = commands::alerts::build(&conn, &ctx, &user, &session).unwrap();
    assert_eq!(ids(&again.alerts), ["das-due"]);
    let fresh = commands::alerts::build(&conn, &ctx, &user, &AlertSession::new()).unwrap();
    assert_eq!(ids(&fresh.alerts), ["das-due", "backup"]);
}
