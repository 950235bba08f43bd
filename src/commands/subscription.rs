// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{Ctx, required};
use crate::config::webhook_secret;
use crate::subscription::{self, WebhookOutcome};

pub fn handle(conn: &mut Connection, ctx: &Ctx<'_>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("webhook", sub)) => {
            let path = required(sub, "payload")?;
            let body =
                std::fs::read(path).with_context(|| format!("Read webhook payload {}", path))?;
            let signature = required(sub, "signature")?;
            let secret = webhook_secret()?;
            match subscription::process_webhook(conn, &secret, &body, signature, ctx.clock.now())? {
                WebhookOutcome::Applied { user_id, status } => {
                    println!("User #{} is now {}", user_id, status)
                }
                WebhookOutcome::Duplicate => println!("Already processed; nothing changed"),
                WebhookOutcome::Ignored(status) => {
                    println!("Status '{}' recorded, no change applied", status)
                }
            }
        }
        Some(("expire-check", _)) => {
            let n = subscription::expire_overdue_trials(conn, ctx.clock.now())?;
            println!("{} trial(s) expired", n);
        }
        _ => {}
    }
    Ok(())
}
