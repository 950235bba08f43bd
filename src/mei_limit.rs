// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::config::FiscalTable;
use crate::error::{MeiError, MeiResult};

pub const DEFAULT_NEAR_LIMIT_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStatus {
    Within,
    NearLimit,
    OverLimit,
}

impl fmt::Display for LimitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitStatus::Within => "within",
            LimitStatus::NearLimit => "near_limit",
            LimitStatus::OverLimit => "over_limit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitReport {
    pub revenue: Decimal,
    pub ceiling: Decimal,
    pub percentage_used: Decimal,
    /// Negative once the ceiling is exceeded.
    pub remaining: Decimal,
    pub status: LimitStatus,
}

/// Compares annual revenue against the MEI ceiling.
pub fn evaluate(revenue: Decimal, ceiling: Decimal) -> MeiResult<LimitReport> {
    evaluate_with_threshold(revenue, ceiling, DEFAULT_NEAR_LIMIT_PERCENT)
}

pub fn evaluate_for(revenue: Decimal, table: &FiscalTable) -> MeiResult<LimitReport> {
    evaluate_with_threshold(revenue, table.annual_ceiling, table.near_limit_percent)
}

pub fn evaluate_with_threshold(
    revenue: Decimal,
    ceiling: Decimal,
    near_limit_percent: Decimal,
) -> MeiResult<LimitReport> {
    if revenue < Decimal::ZERO {
        return Err(MeiError::validation(format!(
            "Revenue must not be negative, got {}",
            revenue
        )));
    }
    if ceiling <= Decimal::ZERO {
        return Err(MeiError::config(format!(
            "Annual ceiling must be positive, got {}",
            ceiling
        )));
    }
    let percentage_used = revenue / ceiling * Decimal::ONE_HUNDRED;
    let status = if percentage_used <= near_limit_percent {
        LimitStatus::Within
    } else if percentage_used <= Decimal::ONE_HUNDRED {
        LimitStatus::NearLimit
    } else {
        LimitStatus::OverLimit
    };
    Ok(LimitReport {
        revenue,
        ceiling,
        percentage_used,
        remaining: ceiling - revenue,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CEILING: i64 = 81000;

    fn eval(revenue: i64) -> LimitReport {
        evaluate(Decimal::new(revenue, 0), Decimal::new(CEILING, 0)).unwrap()
    }

    #[test]
    fn status_buckets_at_the_edges() {
        let at80 = eval(64800);
        assert_eq!(at80.percentage_used, Decimal::new(80, 0));
        assert_eq!(at80.status, LimitStatus::Within);
        assert_eq!(eval(64801).status, LimitStatus::NearLimit);
        assert_eq!(eval(81000).status, LimitStatus::NearLimit);
        assert_eq!(eval(81001).status, LimitStatus::OverLimit);
        assert_eq!(eval(0).status, LimitStatus::Within);
    }

    #[test]
    fn default_near_threshold_is_eighty_percent() {
        assert_eq!(DEFAULT_NEAR_LIMIT_PERCENT, Decimal::from(80));
        assert_eq!(DEFAULT_NEAR_LIMIT_PERCENT.scale(), 0);
    }

    #[test]
    fn remaining_goes_negative_past_ceiling() {
        assert_eq!(eval(90000).remaining, Decimal::new(-9000, 0));
    }

    #[test]
    fn repeated_evaluation_is_stable() {
        assert_eq!(eval(70000), eval(70000));
    }

    #[test]
    fn rejects_negative_revenue_and_bad_ceiling() {
        assert!(matches!(
            evaluate(Decimal::new(-1, 0), Decimal::new(CEILING, 0)),
            Err(MeiError::Validation(_))
        ));
        assert!(matches!(
            evaluate(Decimal::ONE, Decimal::ZERO),
            Err(MeiError::Config(_))
        ));
    }
}
