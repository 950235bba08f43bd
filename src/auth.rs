// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Sign-up, login and the local session.
//!
//! Passwords are stored as salted PBKDF2-HMAC-SHA256 digests in the form
//! `pbkdf2-sha256$<iterations>$<salt>$<digest>` (base64 parts).

use base64::{Engine as _, engine::general_purpose};
use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use ring::{
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};
use rusqlite::Connection;
use std::num::NonZeroU32;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::FiscalConfig;
use crate::error::{MeiError, MeiResult};
use crate::models::UserAccount;
use crate::store::{self, NewUser};

const SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;
const SESSION_KEY: &str = "session_user";

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub fn validate_email(email: &str) -> MeiResult<()> {
    match EMAIL_RE.as_ref() {
        Some(re) if re.is_match(email.trim()) => Ok(()),
        _ => Err(MeiError::validation(format!("Invalid email '{}'", email))),
    }
}

pub fn hash_password(password: &str) -> MeiResult<String> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| MeiError::config("Failed to generate salt"))?;
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| MeiError::config("Invalid iterations"))?;
    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut digest,
    );
    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        PBKDF2_ITERATIONS,
        general_purpose::STANDARD.encode(salt),
        general_purpose::STANDARD.encode(digest)
    ))
}

/// Constant-time check of `password` against a stored digest. Malformed
/// digests never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 4 || parts[0] != SCHEME {
        return false;
    }
    let Some(iterations) = parts[1].parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(digest)) = (
        general_purpose::STANDARD.decode(parts[2]),
        general_purpose::STANDARD.decode(parts[3]),
    ) else {
        return false;
    };
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &digest,
    )
    .is_ok()
}

/// Creates an account on a fresh trial.
pub fn signup(
    conn: &Connection,
    cfg: &FiscalConfig,
    clock: &dyn Clock,
    name: &str,
    email: &str,
    password: &str,
) -> MeiResult<UserAccount> {
    let name = name.trim();
    let email = email.trim().to_lowercase();
    if name.is_empty() {
        return Err(MeiError::validation("Name is required"));
    }
    validate_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MeiError::validation(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if store::find_user_by_email(conn, &email)?.is_some() {
        return Err(MeiError::validation(format!(
            "An account already exists for {}",
            email
        )));
    }
    let hash = hash_password(password)?;
    let now = clock.now();
    let id = store::insert_user(
        conn,
        &NewUser {
            name,
            email: &email,
            password_hash: &hash,
            trial_start: now,
            trial_expires_at: now + Duration::days(cfg.trial_days),
        },
    )?;
    info!(user_id = id, "account created on trial");
    store::get_user(conn, id)
}

/// Checks credentials and opens the session. Unknown email and wrong
/// password fail the same way.
pub fn login(conn: &Connection, email: &str, password: &str) -> MeiResult<UserAccount> {
    let invalid = || MeiError::Unauthorized("invalid email or password".into());
    let user = store::find_user_by_email(conn, email)?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "failed login");
        return Err(invalid());
    }
    store::set_setting(conn, SESSION_KEY, &user.id.to_string())?;
    info!(user_id = user.id, "session opened");
    Ok(user)
}

pub fn logout(conn: &Connection) -> MeiResult<()> {
    store::clear_setting(conn, SESSION_KEY)
}

/// The logged-in user.
pub fn current_user(conn: &Connection) -> MeiResult<UserAccount> {
    let no_session = || MeiError::Unauthorized("not logged in (run `gestaomei account login`)".into());
    let raw = store::get_setting(conn, SESSION_KEY)?.ok_or_else(no_session)?;
    let id = raw.parse::<i64>().map_err(|_| no_session())?;
    match store::get_user(conn, id) {
        Err(MeiError::NotFound(_)) => Err(no_session()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_and_is_salted() {
        let a = hash_password("segredo123").unwrap();
        let b = hash_password("segredo123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("segredo123", &a));
        assert!(verify_password("segredo123", &b));
        assert!(!verify_password("segredo124", &a));
    }

    #[test]
    fn malformed_digest_never_verifies() {
        assert!(!verify_password("x", "x"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$AAAA$AAAA"));
        assert!(!verify_password("x", "md5$1$AAAA$AAAA"));
        // a plaintext value left in the column must not match itself
        assert!(!verify_password("segredo123", "segredo123"));
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email(" ana@example.com ").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana example.com").is_err());
    }
}
