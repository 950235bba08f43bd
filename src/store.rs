// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger store: typed reads and single-record writes over SQLite.
//!
//! Every query is scoped by `user_id`. Amounts are stored as decimal text and
//! a row that fails to decode fails the whole fetch.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::auth::validate_email;
use crate::error::{MeiError, MeiResult};
use crate::models::{
    DateRange, ExpenseEntry, IncomeEntry, NewEntry, NotificationSettings, Payable, Receivable,
    SubscriptionStatus, UserAccount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerTable {
    Income,
    Expenses,
    Payables,
    Receivables,
}

impl LedgerTable {
    fn name(self) -> &'static str {
        match self {
            LedgerTable::Income => "income",
            LedgerTable::Expenses => "expenses",
            LedgerTable::Payables => "payables",
            LedgerTable::Receivables => "receivables",
        }
    }

    fn date_column(self) -> &'static str {
        match self {
            LedgerTable::Income | LedgerTable::Expenses => "date",
            LedgerTable::Payables | LedgerTable::Receivables => "due_date",
        }
    }

    fn flag_column(self) -> &'static str {
        match self {
            LedgerTable::Income | LedgerTable::Receivables => "received",
            LedgerTable::Expenses | LedgerTable::Payables => "paid",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            LedgerTable::Income => {
                "id, user_id, description, amount, date, category, received, received_date"
            }
            LedgerTable::Expenses => {
                "id, user_id, description, amount, date, category, paid, paid_date"
            }
            LedgerTable::Payables => "id, user_id, description, amount, due_date, category, paid",
            LedgerTable::Receivables => "id, user_id, description, amount, due_date, received",
        }
    }
}

/// Filter accepted by every ledger query. The range applies to the entry
/// date (income, expenses) or the due date (payables, receivables); the flag
/// to `received` / `paid`.
#[derive(Debug, Clone, Copy)]
pub struct LedgerFilter {
    pub user_id: i64,
    pub range: Option<DateRange>,
    pub flag: Option<bool>,
}

impl LedgerFilter {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            range: None,
            flag: None,
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn flagged(mut self, flag: bool) -> Self {
        self.flag = Some(flag);
        self
    }
}

fn decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.trim()
        .parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn select<T>(
    conn: &Connection,
    table: LedgerTable,
    filter: &LedgerFilter,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> MeiResult<Vec<T>> {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE user_id=?",
        table.columns(),
        table.name()
    );
    let mut args: Vec<Value> = vec![Value::Integer(filter.user_id)];
    if let Some(range) = filter.range {
        sql.push_str(&format!(
            " AND {col}>=? AND {col}<=?",
            col = table.date_column()
        ));
        args.push(Value::Text(range.start.to_string()));
        args.push(Value::Text(range.end.to_string()));
    }
    if let Some(flag) = filter.flag {
        sql.push_str(&format!(" AND {}=?", table.flag_column()));
        args.push(Value::Integer(flag as i64));
    }
    sql.push_str(&format!(" ORDER BY {} ASC, id ASC", table.date_column()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), map)?;
    let out = rows.collect::<rusqlite::Result<Vec<T>>>()?;
    debug!(table = table.name(), ?filter, rows = out.len(), "ledger query");
    Ok(out)
}

fn income_from_row(r: &Row<'_>) -> rusqlite::Result<IncomeEntry> {
    Ok(IncomeEntry {
        id: r.get(0)?,
        user_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_at(r, 3)?,
        date: r.get(4)?,
        category: r.get(5)?,
        received: r.get(6)?,
        received_date: r.get(7)?,
    })
}

fn expense_from_row(r: &Row<'_>) -> rusqlite::Result<ExpenseEntry> {
    Ok(ExpenseEntry {
        id: r.get(0)?,
        user_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_at(r, 3)?,
        date: r.get(4)?,
        category: r.get(5)?,
        paid: r.get(6)?,
        paid_date: r.get(7)?,
    })
}

fn payable_from_row(r: &Row<'_>) -> rusqlite::Result<Payable> {
    Ok(Payable {
        id: r.get(0)?,
        user_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_at(r, 3)?,
        due_date: r.get(4)?,
        category: r.get(5)?,
        paid: r.get(6)?,
    })
}

fn receivable_from_row(r: &Row<'_>) -> rusqlite::Result<Receivable> {
    Ok(Receivable {
        id: r.get(0)?,
        user_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_at(r, 3)?,
        due_date: r.get(4)?,
        received: r.get(5)?,
    })
}

pub fn query_income(conn: &Connection, filter: &LedgerFilter) -> MeiResult<Vec<IncomeEntry>> {
    select(conn, LedgerTable::Income, filter, income_from_row)
}

pub fn query_expenses(conn: &Connection, filter: &LedgerFilter) -> MeiResult<Vec<ExpenseEntry>> {
    select(conn, LedgerTable::Expenses, filter, expense_from_row)
}

pub fn query_payables(conn: &Connection, filter: &LedgerFilter) -> MeiResult<Vec<Payable>> {
    select(conn, LedgerTable::Payables, filter, payable_from_row)
}

pub fn query_receivables(conn: &Connection, filter: &LedgerFilter) -> MeiResult<Vec<Receivable>> {
    select(conn, LedgerTable::Receivables, filter, receivable_from_row)
}

fn validate_record(description: &str, amount: Decimal, category: Option<&str>) -> MeiResult<()> {
    if description.trim().is_empty() {
        return Err(MeiError::validation("Description is required"));
    }
    if amount <= Decimal::ZERO {
        return Err(MeiError::validation(format!(
            "Amount must be greater than zero, got {}",
            amount
        )));
    }
    if let Some(c) = category {
        if c.trim().is_empty() {
            return Err(MeiError::validation("Category is required"));
        }
    }
    Ok(())
}

/// Inserts an income entry. A settled entry is stamped received on `today`.
pub fn insert_income(
    conn: &Connection,
    user_id: i64,
    entry: &NewEntry,
    today: NaiveDate,
) -> MeiResult<i64> {
    validate_record(&entry.description, entry.amount, Some(&entry.category))?;
    let received_date = entry.settled.then_some(today);
    conn.execute(
        "INSERT INTO income(user_id, description, amount, date, category, received, received_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            entry.description.trim(),
            entry.amount.to_string(),
            entry.date,
            entry.category.trim(),
            entry.settled,
            received_date
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id, id, amount = %entry.amount, "income recorded");
    Ok(id)
}

pub fn insert_expense(
    conn: &Connection,
    user_id: i64,
    entry: &NewEntry,
    today: NaiveDate,
) -> MeiResult<i64> {
    validate_record(&entry.description, entry.amount, Some(&entry.category))?;
    let paid_date = entry.settled.then_some(today);
    conn.execute(
        "INSERT INTO expenses(user_id, description, amount, date, category, paid, paid_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            entry.description.trim(),
            entry.amount.to_string(),
            entry.date,
            entry.category.trim(),
            entry.settled,
            paid_date
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id, id, amount = %entry.amount, "expense recorded");
    Ok(id)
}

pub fn insert_payable(
    conn: &Connection,
    user_id: i64,
    description: &str,
    amount: Decimal,
    due_date: NaiveDate,
    category: &str,
) -> MeiResult<i64> {
    validate_record(description, amount, Some(category))?;
    conn.execute(
        "INSERT INTO payables(user_id, description, amount, due_date, category, paid)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            user_id,
            description.trim(),
            amount.to_string(),
            due_date,
            category.trim()
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id, id, %due_date, "payable recorded");
    Ok(id)
}

pub fn insert_receivable(
    conn: &Connection,
    user_id: i64,
    description: &str,
    amount: Decimal,
    due_date: NaiveDate,
) -> MeiResult<i64> {
    validate_record(description, amount, None)?;
    conn.execute(
        "INSERT INTO receivables(user_id, description, amount, due_date, received)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![user_id, description.trim(), amount.to_string(), due_date],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id, id, %due_date, "receivable recorded");
    Ok(id)
}

fn expect_one(changed: usize, what: &str, id: i64) -> MeiResult<()> {
    if changed == 0 {
        return Err(MeiError::NotFound(format!("{} #{}", what, id)));
    }
    Ok(())
}

/// Sets or clears the received flag; the date moves with the flag.
pub fn set_income_received(
    conn: &Connection,
    user_id: i64,
    id: i64,
    received: bool,
    today: NaiveDate,
) -> MeiResult<()> {
    let n = conn.execute(
        "UPDATE income SET received=?1, received_date=?2 WHERE id=?3 AND user_id=?4",
        params![received, received.then_some(today), id, user_id],
    )?;
    expect_one(n, "income", id)
}

pub fn set_expense_paid(
    conn: &Connection,
    user_id: i64,
    id: i64,
    paid: bool,
    today: NaiveDate,
) -> MeiResult<()> {
    let n = conn.execute(
        "UPDATE expenses SET paid=?1, paid_date=?2 WHERE id=?3 AND user_id=?4",
        params![paid, paid.then_some(today), id, user_id],
    )?;
    expect_one(n, "expense", id)
}

pub fn mark_payable_paid(conn: &Connection, user_id: i64, id: i64) -> MeiResult<()> {
    let n = conn.execute(
        "UPDATE payables SET paid=1 WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    expect_one(n, "payable", id)
}

pub fn mark_receivable_received(conn: &Connection, user_id: i64, id: i64) -> MeiResult<()> {
    let n = conn.execute(
        "UPDATE receivables SET received=1 WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    expect_one(n, "receivable", id)
}

pub fn delete(conn: &Connection, table: LedgerTable, user_id: i64, id: i64) -> MeiResult<()> {
    let n = conn.execute(
        &format!("DELETE FROM {} WHERE id=?1 AND user_id=?2", table.name()),
        params![id, user_id],
    )?;
    expect_one(n, table.name(), id)?;
    info!(user_id, id, table = table.name(), "record deleted");
    Ok(())
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub trial_start: DateTime<Utc>,
    pub trial_expires_at: DateTime<Utc>,
}

pub fn insert_user(conn: &Connection, user: &NewUser<'_>) -> MeiResult<i64> {
    conn.execute(
        "INSERT INTO users(name, email, password_hash, trial_start, trial_expires_at, subscription_status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'trial')",
        params![
            user.name,
            user.email,
            user.password_hash,
            user.trial_start,
            user.trial_expires_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const USER_COLUMNS: &str = "id, name, email, password_hash, trial_start, trial_expires_at, \
     subscription_status, last_charge_date, subscription_id";

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<UserAccount> {
    let status: String = r.get(6)?;
    let subscription_status = status
        .parse::<SubscriptionStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(UserAccount {
        id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        password_hash: r.get(3)?,
        trial_start: r.get(4)?,
        trial_expires_at: r.get(5)?,
        subscription_status,
        last_charge_date: r.get(7)?,
        subscription_id: r.get(8)?,
    })
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> MeiResult<Option<UserAccount>> {
    let user = conn
        .query_row(
            &format!(
                "SELECT {} FROM users WHERE lower(email)=lower(?1)",
                USER_COLUMNS
            ),
            params![email.trim()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: i64) -> MeiResult<UserAccount> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id=?1", USER_COLUMNS),
        params![user_id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| MeiError::NotFound(format!("user #{}", user_id)))
}

pub fn list_users_by_status(
    conn: &Connection,
    status: SubscriptionStatus,
) -> MeiResult<Vec<UserAccount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE subscription_status=?1 ORDER BY id",
        USER_COLUMNS
    ))?;
    let rows = stmt.query_map(params![status.as_str()], user_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Writes a subscription status. Charge date and subscription id are only
/// overwritten when provided.
pub fn update_subscription(
    conn: &Connection,
    user_id: i64,
    status: SubscriptionStatus,
    last_charge_date: Option<DateTime<Utc>>,
    subscription_id: Option<&str>,
) -> MeiResult<()> {
    let n = conn.execute(
        "UPDATE users SET subscription_status=?1,
             last_charge_date=COALESCE(?2, last_charge_date),
             subscription_id=COALESCE(?3, subscription_id)
         WHERE id=?4",
        params![status.as_str(), last_charge_date, subscription_id, user_id],
    )?;
    expect_one(n, "user", user_id)
}

pub fn get_notification_settings(
    conn: &Connection,
    user: &UserAccount,
) -> MeiResult<NotificationSettings> {
    let found = conn
        .query_row(
            "SELECT user_id, upcoming_due_enabled, weekly_report_enabled, mei_limit_alert_enabled,
                    lead_days, notification_email
             FROM notification_settings WHERE user_id=?1",
            params![user.id],
            |r| {
                Ok(NotificationSettings {
                    user_id: r.get(0)?,
                    upcoming_due_enabled: r.get(1)?,
                    weekly_report_enabled: r.get(2)?,
                    mei_limit_alert_enabled: r.get(3)?,
                    lead_days: r.get(4)?,
                    notification_email: r.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(found.unwrap_or_else(|| NotificationSettings::defaults_for(user)))
}

pub fn upsert_notification_settings(
    conn: &Connection,
    settings: &NotificationSettings,
) -> MeiResult<()> {
    if !NotificationSettings::LEAD_DAY_CHOICES.contains(&settings.lead_days) {
        return Err(MeiError::validation(format!(
            "Lead days must be one of {:?}, got {}",
            NotificationSettings::LEAD_DAY_CHOICES,
            settings.lead_days
        )));
    }
    validate_email(&settings.notification_email)?;
    conn.execute(
        "INSERT INTO notification_settings(user_id, upcoming_due_enabled, weekly_report_enabled,
             mei_limit_alert_enabled, lead_days, notification_email, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(user_id) DO UPDATE SET
             upcoming_due_enabled=excluded.upcoming_due_enabled,
             weekly_report_enabled=excluded.weekly_report_enabled,
             mei_limit_alert_enabled=excluded.mei_limit_alert_enabled,
             lead_days=excluded.lead_days,
             notification_email=excluded.notification_email,
             updated_at=excluded.updated_at",
        params![
            settings.user_id,
            settings.upcoming_due_enabled,
            settings.weekly_report_enabled,
            settings.mei_limit_alert_enabled,
            settings.lead_days,
            settings.notification_email.trim()
        ],
    )?;
    info!(user_id = settings.user_id, "notification settings saved");
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> MeiResult<Option<String>> {
    let v = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> MeiResult<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn clear_setting(conn: &Connection, key: &str) -> MeiResult<()> {
    conn.execute("DELETE FROM settings WHERE key=?1", params![key])?;
    Ok(())
}

fn backup_key(user_id: i64) -> String {
    format!("last_backup:{}", user_id)
}

pub fn last_backup(conn: &Connection, user_id: i64) -> MeiResult<Option<DateTime<Utc>>> {
    match get_setting(conn, &backup_key(user_id))? {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| MeiError::validation(format!("Invalid backup timestamp '{}': {}", s, e))),
        None => Ok(None),
    }
}

pub fn record_backup(conn: &Connection, user_id: i64, at: DateTime<Utc>) -> MeiResult<()> {
    set_setting(conn, &backup_key(user_id), &at.to_rfc3339())
}

/// Records a webhook event id. Returns false when the id was already seen.
pub fn record_webhook_event(
    conn: &Connection,
    webhook_id: &str,
    email: &str,
    status: &str,
    at: DateTime<Utc>,
) -> MeiResult<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO webhook_events(webhook_id, email, status, received_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![webhook_id, email, status, at.to_rfc3339()],
    )?;
    Ok(n == 1)
}
