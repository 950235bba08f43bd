// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MeiError;

pub const INCOME_CATEGORIES: &[&str] = &["Venda Produtos", "Prestação Serviços", "Outras"];

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Fornecedores",
    "Aluguel",
    "Água/Luz",
    "Internet",
    "Produtos",
    "Combustível",
    "Marketing",
    "Outras",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub received: bool,
    pub received_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payable {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub category: String,
    pub paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub received: bool,
}

/// Fields shared by income and expense submissions.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub settled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = MeiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(MeiError::validation(format!(
                "Unknown subscription status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub trial_start: DateTime<Utc>,
    pub trial_expires_at: DateTime<Utc>,
    pub subscription_status: SubscriptionStatus,
    pub last_charge_date: Option<DateTime<Utc>>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub user_id: i64,
    pub upcoming_due_enabled: bool,
    pub weekly_report_enabled: bool,
    pub mei_limit_alert_enabled: bool,
    pub lead_days: u32,
    pub notification_email: String,
}

impl NotificationSettings {
    pub const LEAD_DAY_CHOICES: [u32; 4] = [1, 3, 5, 7];

    pub fn defaults_for(user: &UserAccount) -> Self {
        Self {
            user_id: user.id,
            upcoming_due_enabled: true,
            weekly_report_enabled: true,
            mei_limit_alert_enabled: true,
            lead_days: 3,
            notification_email: user.email.clone(),
        }
    }
}

/// MEI activity category, which selects the monthly DAS amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Commerce,
    Services,
    CommerceAndServices,
}

impl ActivityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Commerce => "commerce",
            ActivityCategory::Services => "services",
            ActivityCategory::CommerceAndServices => "commerce_and_services",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityCategory::Commerce => "Comércio",
            ActivityCategory::Services => "Serviços",
            ActivityCategory::CommerceAndServices => "Comércio e Serviços",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = MeiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "commerce" => Ok(ActivityCategory::Commerce),
            "services" => Ok(ActivityCategory::Services),
            "commerce_and_services" => Ok(ActivityCategory::CommerceAndServices),
            other => Err(MeiError::config(format!(
                "Unknown activity category '{}' (use commerce|services|commerce_and_services)",
                other
            ))),
        }
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MeiError> {
        if end < start {
            return Err(MeiError::validation(format!(
                "Range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let next = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next.and_then(|d| d.pred_opt()).unwrap_or(start);
        Self { start, end }
    }

    pub fn year_of(date: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
        let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
        Self { start, end }
    }

    /// `today ..= today + days`.
    pub fn days_from(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today,
            end: today + Duration::days(days),
        }
    }

    /// The month immediately before the one containing `date`.
    pub fn previous_month_of(date: NaiveDate) -> Self {
        let first = Self::month_of(date).start;
        first
            .pred_opt()
            .map(Self::month_of)
            .unwrap_or_else(|| Self::month_of(first))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_ranges_cover_whole_month() {
        let feb = DateRange::month_of(d(2024, 2, 14));
        assert_eq!(feb.start, d(2024, 2, 1));
        assert_eq!(feb.end, d(2024, 2, 29));
        let dec = DateRange::month_of(d(2024, 12, 31));
        assert_eq!(dec.end, d(2024, 12, 31));
        let prev = DateRange::previous_month_of(d(2025, 1, 10));
        assert_eq!(prev.start, d(2024, 12, 1));
        assert_eq!(prev.end, d(2024, 12, 31));
    }

    #[test]
    fn unknown_activity_category_is_config_error() {
        assert!(matches!(
            "industria".parse::<ActivityCategory>(),
            Err(MeiError::Config(_))
        ));
        assert_eq!(
            "commerce-and-services".parse::<ActivityCategory>().unwrap(),
            ActivityCategory::CommerceAndServices
        );
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(DateRange::new(d(2024, 3, 2), d(2024, 3, 1)).is_err());
        assert!(DateRange::new(d(2024, 3, 1), d(2024, 3, 1)).is_ok());
    }
}
