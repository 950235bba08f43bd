// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! DAS (monthly MEI tax document) calculator.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::FiscalTable;
use crate::error::{MeiError, MeiResult};
use crate::mei_limit::{self, LimitReport};
use crate::models::ActivityCategory;
use crate::utils::fmt_brl;

/// Where the revenue figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum RevenueSource {
    /// Sum of the year's income entries.
    Aggregated(Decimal),
    /// A figure typed in by the user.
    Estimate(Decimal),
}

impl RevenueSource {
    pub fn value(&self) -> Decimal {
        match *self {
            RevenueSource::Aggregated(v) | RevenueSource::Estimate(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DasQuote {
    pub fiscal_year: i32,
    pub category: ActivityCategory,
    pub monthly: Decimal,
    pub annual: Decimal,
    /// Annual DAS as a percentage of revenue.
    pub effective_rate: Decimal,
    pub revenue_base: RevenueSource,
    pub limit: LimitReport,
}

pub fn compute(
    table: &FiscalTable,
    category: ActivityCategory,
    source: RevenueSource,
) -> MeiResult<DasQuote> {
    let revenue = source.value();
    if revenue < Decimal::ZERO {
        return Err(MeiError::validation(format!(
            "Revenue must not be negative, got {}",
            revenue
        )));
    }
    let monthly = table.das_monthly_for(category)?;
    let annual = monthly * Decimal::from(12);
    let effective_rate = annual / revenue.max(Decimal::ONE) * Decimal::ONE_HUNDRED;
    let limit = mei_limit::evaluate_for(revenue, table)?;
    tracing::debug!(%category, %monthly, %revenue, "DAS computed");
    Ok(DasQuote {
        fiscal_year: table.year,
        category,
        monthly,
        annual,
        effective_rate,
        revenue_base: source,
        limit,
    })
}

/// The next DAS due date on or after `today`.
pub fn next_due_date(today: NaiveDate, due_day: u32) -> NaiveDate {
    if today.day() <= due_day {
        if let Some(d) = today.with_day(due_day) {
            return d;
        }
    }
    let (y, m) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, due_day).unwrap_or(today)
}

impl DasQuote {
    /// Plain-text summary for sharing.
    pub fn summary_text(&self) -> String {
        format!(
            "DAS MEI calculator ({})\n\
             Category: {}\n\
             Monthly DAS: {}\n\
             Annual DAS: {}\n\
             Revenue: {}\n\n\
             Keep your DAS up to date to preserve your social security rights.",
            self.fiscal_year,
            self.category.label(),
            fmt_brl(&self.monthly),
            fmt_brl(&self.annual),
            fmt_brl(&self.revenue_base.value()),
        )
    }
}
