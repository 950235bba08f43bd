// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Subscription lifecycle: trial expiry, access gating and payment webhooks.
//!
//! Status only changes in response to external events (a payment
//! notification or the trial expiry check):
//!
//! ```text
//! trial    --PaymentApproved--> active
//! trial    --TrialElapsed-----> expired
//! active   --Canceled---------> canceled
//! canceled --PaymentApproved--> active
//! ```
//!
//! A payment on an active subscription is a renewal and keeps it active.

use chrono::{DateTime, Utc};
use ring::hmac;
use rusqlite::Connection;
use serde::Deserialize;
use std::fmt;
use tracing::{info, warn};

use crate::error::{MeiError, MeiResult};
use crate::models::{SubscriptionStatus, UserAccount};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    PaymentApproved,
    TrialElapsed,
    Canceled,
}

impl fmt::Display for SubscriptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubscriptionEvent::PaymentApproved => "payment approved",
            SubscriptionEvent::TrialElapsed => "trial elapsed",
            SubscriptionEvent::Canceled => "cancellation",
        })
    }
}

impl SubscriptionStatus {
    pub fn apply(self, event: SubscriptionEvent) -> MeiResult<SubscriptionStatus> {
        use SubscriptionEvent as E;
        use SubscriptionStatus as S;
        match (self, event) {
            (S::Trial | S::Canceled | S::Active, E::PaymentApproved) => Ok(S::Active),
            (S::Trial, E::TrialElapsed) => Ok(S::Expired),
            (S::Active, E::Canceled) => Ok(S::Canceled),
            (from, event) => Err(MeiError::InvalidTransition {
                from,
                event: event.to_string(),
            }),
        }
    }

    pub fn grants_access(self) -> bool {
        matches!(self, SubscriptionStatus::Trial | SubscriptionStatus::Active)
    }
}

/// Whole days left until `expires_at`, rounded up. Zero or negative once the
/// instant has passed.
pub fn days_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY: i64 = 86_400;
    let secs = (expires_at - now).num_seconds();
    let q = secs / DAY;
    if secs % DAY > 0 { q + 1 } else { q }
}

/// Moves an elapsed trial to `expired` and persists it. Returns the user as
/// stored afterwards.
pub fn check_trial_expiry(
    conn: &Connection,
    user: UserAccount,
    now: DateTime<Utc>,
) -> MeiResult<UserAccount> {
    if user.subscription_status != SubscriptionStatus::Trial || user.trial_expires_at > now {
        return Ok(user);
    }
    let next = user
        .subscription_status
        .apply(SubscriptionEvent::TrialElapsed)?;
    store::update_subscription(conn, user.id, next, None, None)?;
    info!(user_id = user.id, "trial expired");
    Ok(UserAccount {
        subscription_status: next,
        ..user
    })
}

/// Runs the expiry check for every user still on trial.
pub fn expire_overdue_trials(conn: &Connection, now: DateTime<Utc>) -> MeiResult<usize> {
    let mut expired = 0;
    for user in store::list_users_by_status(conn, SubscriptionStatus::Trial)? {
        let after = check_trial_expiry(conn, user, now)?;
        if after.subscription_status == SubscriptionStatus::Expired {
            expired += 1;
        }
    }
    Ok(expired)
}

/// Gate for every ledger operation.
pub fn ensure_access(
    conn: &Connection,
    user: UserAccount,
    now: DateTime<Utc>,
) -> MeiResult<UserAccount> {
    let user = check_trial_expiry(conn, user, now)?;
    if !user.subscription_status.grants_access() {
        return Err(MeiError::Unauthorized(format!(
            "subscription is {}; renew your plan to continue",
            user.subscription_status
        )));
    }
    Ok(user)
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub email: String,
    pub status: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    pub webhook_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied {
        user_id: i64,
        status: SubscriptionStatus,
    },
    /// The event id was processed before; nothing changed.
    Duplicate,
    /// Valid event whose status this application does not act on.
    Ignored(String),
}

/// Hex HMAC-SHA256 of `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, body).as_ref())
}

pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> MeiResult<()> {
    let unauthorized = || MeiError::Unauthorized("invalid webhook signature".into());
    let tag = hex::decode(signature_hex.trim()).map_err(|_| unauthorized())?;
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &tag).map_err(|_| unauthorized())
}

fn event_for(status: &str) -> Option<SubscriptionEvent> {
    match status.trim().to_lowercase().as_str() {
        "approved" => Some(SubscriptionEvent::PaymentApproved),
        "canceled" | "cancelled" => Some(SubscriptionEvent::Canceled),
        _ => None,
    }
}

/// Verifies, de-duplicates and applies one payment notification. The event
/// id and the status change commit together.
pub fn process_webhook(
    conn: &mut Connection,
    secret: &str,
    body: &[u8],
    signature_hex: &str,
    now: DateTime<Utc>,
) -> MeiResult<WebhookOutcome> {
    if let Err(e) = verify_signature(secret, body, signature_hex) {
        warn!("rejected webhook with bad signature");
        return Err(e);
    }
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    if payload.webhook_id.trim().is_empty() {
        return Err(MeiError::validation("webhook_id is required"));
    }

    let tx = conn.transaction()?;
    let user = store::find_user_by_email(&tx, &payload.email)?
        .ok_or_else(|| MeiError::NotFound(format!("user {}", payload.email)))?;
    if !store::record_webhook_event(&tx, &payload.webhook_id, &payload.email, &payload.status, now)?
    {
        info!(webhook_id = %payload.webhook_id, "duplicate webhook ignored");
        return Ok(WebhookOutcome::Duplicate);
    }

    let outcome = match event_for(&payload.status) {
        Some(event) => {
            let next = user.subscription_status.apply(event)?;
            let charged = (event == SubscriptionEvent::PaymentApproved).then_some(now);
            store::update_subscription(
                &tx,
                user.id,
                next,
                charged,
                payload.subscription_id.as_deref(),
            )?;
            info!(user_id = user.id, from = %user.subscription_status, to = %next, "subscription updated");
            WebhookOutcome::Applied {
                user_id: user.id,
                status: next,
            }
        }
        None => {
            info!(status = %payload.status, "webhook status not acted on");
            WebhookOutcome::Ignored(payload.status.clone())
        }
    };
    tx.commit()?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn allowed_transitions() {
        use SubscriptionEvent::*;
        use SubscriptionStatus as S;
        assert_eq!(S::Trial.apply(PaymentApproved).unwrap(), S::Active);
        assert_eq!(S::Trial.apply(TrialElapsed).unwrap(), S::Expired);
        assert_eq!(S::Active.apply(Canceled).unwrap(), S::Canceled);
        assert_eq!(S::Canceled.apply(PaymentApproved).unwrap(), S::Active);
        assert_eq!(S::Active.apply(PaymentApproved).unwrap(), S::Active);
    }

    #[test]
    fn forbidden_transitions() {
        use SubscriptionEvent::*;
        use SubscriptionStatus as S;
        for (from, ev) in [
            (S::Expired, PaymentApproved),
            (S::Expired, Canceled),
            (S::Trial, Canceled),
            (S::Active, TrialElapsed),
            (S::Canceled, Canceled),
        ] {
            assert!(
                matches!(from.apply(ev), Err(MeiError::InvalidTransition { .. })),
                "{:?} on {:?} should be rejected",
                from,
                ev
            );
        }
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_remaining(now + Duration::hours(1), now), 1);
        assert_eq!(days_remaining(now + Duration::hours(24), now), 1);
        assert_eq!(days_remaining(now + Duration::hours(25), now), 2);
        assert_eq!(days_remaining(now, now), 0);
        assert_eq!(days_remaining(now - Duration::hours(30), now), -1);
    }

    #[test]
    fn signatures() {
        let body = br#"{"email":"a@b.com"}"#;
        let sig = sign("s3cret", body);
        assert!(verify_signature("s3cret", body, &sig).is_ok());
        assert!(verify_signature("other", body, &sig).is_err());
        assert!(verify_signature("s3cret", b"tampered", &sig).is_err());
        assert!(verify_signature("s3cret", body, "not-hex").is_err());
    }
}
