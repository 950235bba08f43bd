// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

use crate::models::DateRange;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parses `YYYY-MM` into the full month range.
pub fn parse_month(s: &str) -> Result<DateRange> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok(DateRange::month_of(first))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .replace(',', ".")
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Brazilian real formatting: `R$ 1.234,56`.
pub fn fmt_brl(d: &Decimal) -> String {
    let rounded = d.round_dp(2);
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}R$ {},{}", sign, grouped, frac)
}

pub fn fmt_pct(d: &Decimal, dp: usize) -> String {
    format!("{:.*}%", dp, d)
}

pub fn yes_no(b: bool) -> String {
    if b { "yes".into() } else { "no".into() }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // arrays print one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brl_grouping() {
        assert_eq!(fmt_brl(&Decimal::new(123456, 2)), "R$ 1.234,56");
        assert_eq!(fmt_brl(&Decimal::new(81000, 0)), "R$ 81.000,00");
        assert_eq!(fmt_brl(&Decimal::new(7160, 2)), "R$ 71,60");
        assert_eq!(fmt_brl(&Decimal::new(-100000000, 2)), "-R$ 1.000.000,00");
        assert_eq!(fmt_brl(&Decimal::ZERO), "R$ 0,00");
    }

    #[test]
    fn json_output_only_when_asked() {
        assert!(!maybe_print_json(false, false, &vec![1, 2]).unwrap());
        assert!(maybe_print_json(false, true, &vec![1, 2]).unwrap());
    }

    #[test]
    fn decimal_accepts_comma() {
        assert_eq!(parse_decimal(" 71,60 ").unwrap(), Decimal::new(7160, 2));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn month_parse() {
        let r = parse_month("2024-02").unwrap();
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(parse_month("2024-13").is_err());
    }
}
