// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Versioned fiscal configuration.
//!
//! MEI ceilings and DAS amounts change by fiscal year, so they live in a
//! JSON document keyed by year instead of in the calculators. The shipped
//! default is `fiscal/mei.json`; a user copy in the config directory (or the
//! path in `GESTAOMEI_FISCAL`) replaces it wholesale.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{MeiError, MeiResult};
use crate::models::ActivityCategory;

const DEFAULT_FISCAL_JSON: &str = include_str!("../fiscal/mei.json");
pub const FISCAL_ENV: &str = "GESTAOMEI_FISCAL";
pub const WEBHOOK_SECRET_ENV: &str = "GESTAOMEI_WEBHOOK_SECRET";

static DEFAULT_CONFIG: Lazy<MeiResult<FiscalConfig>> =
    Lazy::new(|| FiscalConfig::from_json(DEFAULT_FISCAL_JSON));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalTable {
    #[serde(skip)]
    pub year: i32,
    pub annual_ceiling: Decimal,
    pub near_limit_percent: Decimal,
    pub das_due_day: u32,
    pub das_warning_from_day: u32,
    pub das_monthly: BTreeMap<ActivityCategory, Decimal>,
}

impl FiscalTable {
    /// Monthly DAS for the category. A category absent from the table is a
    /// configuration fault and is never defaulted.
    pub fn das_monthly_for(&self, category: ActivityCategory) -> MeiResult<Decimal> {
        self.das_monthly.get(&category).copied().ok_or_else(|| {
            MeiError::config(format!(
                "No DAS amount configured for '{}' in fiscal year {}",
                category, self.year
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalConfig {
    pub trial_days: i64,
    pub due_window_days: i64,
    pub backup_stale_days: i64,
    pub years: BTreeMap<i32, FiscalTable>,
}

impl FiscalConfig {
    pub fn from_json(s: &str) -> MeiResult<Self> {
        let mut cfg: FiscalConfig = serde_json::from_str(s)
            .map_err(|e| MeiError::config(format!("Invalid fiscal configuration: {}", e)))?;
        if cfg.years.is_empty() {
            return Err(MeiError::config("Fiscal configuration has no years"));
        }
        if cfg.trial_days < 0 || cfg.due_window_days < 0 || cfg.backup_stale_days < 0 {
            return Err(MeiError::config("Day counts must not be negative"));
        }
        for (year, table) in cfg.years.iter_mut() {
            table.year = *year;
            if table.annual_ceiling <= Decimal::ZERO {
                return Err(MeiError::config(format!(
                    "Annual ceiling for {} must be positive",
                    year
                )));
            }
            if !(1..=28).contains(&table.das_due_day)
                || table.das_warning_from_day == 0
                || table.das_warning_from_day > table.das_due_day
            {
                return Err(MeiError::config(format!(
                    "DAS due/warning days for {} are out of range",
                    year
                )));
            }
            if let Some((cat, _)) = table.das_monthly.iter().find(|(_, v)| v.is_sign_negative()) {
                return Err(MeiError::config(format!(
                    "Negative DAS amount for '{}' in {}",
                    cat, year
                )));
            }
        }
        Ok(cfg)
    }

    /// The configuration shipped with the binary.
    pub fn builtin() -> MeiResult<Self> {
        match &*DEFAULT_CONFIG {
            Ok(cfg) => Ok(cfg.clone()),
            Err(e) => Err(MeiError::config(e.to_string())),
        }
    }

    /// Loads the user override if one exists, otherwise the built-in tables.
    pub fn load() -> MeiResult<Self> {
        match override_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading fiscal configuration");
                let data = std::fs::read_to_string(&path)?;
                Self::from_json(&data)
            }
            _ => Self::builtin(),
        }
    }

    /// Table for `year`. Falls back to the newest earlier year, since the
    /// published figures are not always available when the year starts.
    pub fn table_for(&self, year: i32) -> MeiResult<&FiscalTable> {
        if let Some(t) = self.years.get(&year) {
            return Ok(t);
        }
        match self.years.range(..year).next_back() {
            Some((found, t)) => {
                warn!(
                    requested = year,
                    using = *found,
                    "no fiscal table for year, using most recent earlier table"
                );
                Ok(t)
            }
            None => Err(MeiError::config(format!(
                "No fiscal table configured for {} or any earlier year",
                year
            ))),
        }
    }
}

fn override_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(FISCAL_ENV) {
        return Some(PathBuf::from(p));
    }
    crate::db::project_dirs().map(|p| p.config_dir().join("fiscal.json"))
}

pub fn webhook_secret() -> MeiResult<String> {
    std::env::var(WEBHOOK_SECRET_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| MeiError::config(format!("{} is not set", WEBHOOK_SECRET_ENV)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_match_2024_figures() {
        let cfg = FiscalConfig::builtin().unwrap();
        let t = cfg.table_for(2024).unwrap();
        assert_eq!(t.annual_ceiling, Decimal::new(81000, 0));
        assert_eq!(
            t.das_monthly_for(ActivityCategory::CommerceAndServices).unwrap(),
            Decimal::new(7660, 2)
        );
        assert_eq!(t.das_due_day, 20);
        assert_eq!(cfg.trial_days, 2);
    }

    #[test]
    fn later_year_falls_back_earlier_year_fails() {
        let cfg = FiscalConfig::builtin().unwrap();
        assert_eq!(cfg.table_for(2026).unwrap().year, 2024);
        assert!(matches!(cfg.table_for(2020), Err(MeiError::Config(_))));
    }

    #[test]
    fn missing_category_is_config_error() {
        let json = r#"{"trial_days":2,"due_window_days":7,"backup_stale_days":7,
            "years":{"2025":{"annual_ceiling":"81000","near_limit_percent":"80",
            "das_due_day":20,"das_warning_from_day":15,
            "das_monthly":{"commerce":"75.90"}}}}"#;
        let cfg = FiscalConfig::from_json(json).unwrap();
        let t = cfg.table_for(2025).unwrap();
        assert!(matches!(
            t.das_monthly_for(ActivityCategory::Services),
            Err(MeiError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(FiscalConfig::from_json("{}").is_err());
        let zero_ceiling = r#"{"trial_days":2,"due_window_days":7,"backup_stale_days":7,
            "years":{"2024":{"annual_ceiling":"0","near_limit_percent":"80",
            "das_due_day":20,"das_warning_from_day":15,"das_monthly":{}}}}"#;
        assert!(FiscalConfig::from_json(zero_ceiling).is_err());
    }
}
