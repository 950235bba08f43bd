// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{output_flags, session_user};
use crate::models::NotificationSettings;
use crate::store;
use crate::utils::{maybe_print_json, pretty_table, yes_no};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user = session_user(conn)?;
    match m.subcommand() {
        Some(("show", sub)) => {
            let s = store::get_notification_settings(conn, &user)?;
            let (json_flag, jsonl_flag) = output_flags(sub);
            if !maybe_print_json(json_flag, jsonl_flag, &s)? {
                print(&s);
            }
        }
        Some(("set", sub)) => {
            let current = store::get_notification_settings(conn, &user)?;
            let next = apply_changes(current, sub);
            store::upsert_notification_settings(conn, &next)?;
            print(&next);
        }
        _ => {}
    }
    Ok(())
}

/// Overlays the flags given on the command line; absent flags keep their
/// current value.
pub fn apply_changes(mut s: NotificationSettings, sub: &clap::ArgMatches) -> NotificationSettings {
    if let Some(v) = sub.get_one::<bool>("upcoming-due") {
        s.upcoming_due_enabled = *v;
    }
    if let Some(v) = sub.get_one::<bool>("weekly-report") {
        s.weekly_report_enabled = *v;
    }
    if let Some(v) = sub.get_one::<bool>("mei-limit") {
        s.mei_limit_alert_enabled = *v;
    }
    if let Some(v) = sub.get_one::<u32>("lead-days") {
        s.lead_days = *v;
    }
    if let Some(email) = sub.get_one::<String>("email") {
        s.notification_email = email.trim().to_string();
    }
    s
}

fn print(s: &NotificationSettings) {
    let rows = vec![
        vec!["Upcoming due dates".into(), yes_no(s.upcoming_due_enabled)],
        vec!["Weekly report".into(), yes_no(s.weekly_report_enabled)],
        vec!["MEI limit alert".into(), yes_no(s.mei_limit_alert_enabled)],
        vec!["Lead days".into(), s.lead_days.to_string()],
        vec!["Email".into(), s.notification_email.clone()],
    ];
    println!("{}", pretty_table(&["Notification", "Setting"], rows));
}
