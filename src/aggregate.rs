// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Sums and derived metrics over ledger query results.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{DateRange, ExpenseEntry, IncomeEntry, Payable, Receivable};

/// A dated monetary record.
pub trait Dated {
    fn date(&self) -> NaiveDate;
    fn amount(&self) -> Decimal;
}

impl Dated for IncomeEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Dated for ExpenseEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Dated for Payable {
    fn date(&self) -> NaiveDate {
        self.due_date
    }
    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Dated for Receivable {
    fn date(&self) -> NaiveDate {
        self.due_date
    }
    fn amount(&self) -> Decimal {
        self.amount
    }
}

pub fn total<T: Dated>(entries: &[T]) -> Decimal {
    entries.iter().map(Dated::amount).sum()
}

/// Sum of amounts dated inside `range`, both bounds inclusive.
pub fn sum_in_range<T: Dated>(entries: &[T], range: &DateRange) -> Decimal {
    entries
        .iter()
        .filter(|e| range.contains(e.date()))
        .map(Dated::amount)
        .sum()
}

pub fn sum_where<T: Dated>(entries: &[T], pred: impl Fn(&T) -> bool) -> Decimal {
    entries.iter().filter(|e| pred(e)).map(Dated::amount).sum()
}

/// Month-over-month change in percent. The denominator is clamped to 1 and
/// a zero current value reports no change.
pub fn percent_change(current: Decimal, previous: Decimal) -> Decimal {
    if current.is_zero() {
        return Decimal::ZERO;
    }
    let denom = previous.max(Decimal::ONE);
    (current - previous) / denom * Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: DateRange,
    pub revenue: Decimal,
    pub previous_revenue: Decimal,
    pub revenue_change: Decimal,
    pub expense: Decimal,
    pub previous_expense: Decimal,
    pub expense_change: Decimal,
    pub profit: Decimal,
    pub annual_revenue: Decimal,
}

/// Current-vs-previous month figures plus year-to-date revenue for the
/// month containing `reference`. `income` must cover the whole calendar year
/// and the previous month; `expenses` the two months.
pub fn monthly_summary(
    income: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    reference: NaiveDate,
) -> MonthlySummary {
    let month = DateRange::month_of(reference);
    let prev = DateRange::previous_month_of(reference);
    let year = DateRange::year_of(reference);

    let revenue = sum_in_range(income, &month);
    let previous_revenue = sum_in_range(income, &prev);
    let expense = sum_in_range(expenses, &month);
    let previous_expense = sum_in_range(expenses, &prev);

    MonthlySummary {
        month,
        revenue,
        previous_revenue,
        revenue_change: percent_change(revenue, previous_revenue),
        expense,
        previous_expense,
        expense_change: percent_change(expense, previous_expense),
        profit: revenue - expense,
        annual_revenue: sum_in_range(income, &year),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBreakdown {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub income_received: Decimal,
    pub income_pending: Decimal,
    pub expense_paid: Decimal,
    pub expense_pending: Decimal,
    pub open_payables: Decimal,
    pub open_receivables: Decimal,
}

/// Settlement split of one month's entries. Payables and receivables are the
/// caller's open (unsettled) items regardless of due date.
pub fn month_breakdown(
    income: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    open_payables: &[Payable],
    open_receivables: &[Receivable],
) -> MonthBreakdown {
    let total_income = total(income);
    let total_expense = total(expenses);
    MonthBreakdown {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        income_received: sum_where(income, |e| e.received),
        income_pending: sum_where(income, |e| !e.received),
        expense_paid: sum_where(expenses, |e| e.paid),
        expense_pending: sum_where(expenses, |e| !e.paid),
        open_payables: sum_where(open_payables, |p| !p.paid),
        open_receivables: sum_where(open_receivables, |r| !r.received),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPoint {
    pub month: String,
    pub revenue: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// `months` consecutive month totals ending with the month of `last`,
/// oldest first.
pub fn monthly_series(
    income: &[IncomeEntry],
    expenses: &[ExpenseEntry],
    last: NaiveDate,
    months: usize,
) -> Vec<MonthPoint> {
    let mut ranges = Vec::with_capacity(months);
    let mut cursor = DateRange::month_of(last);
    for _ in 0..months {
        ranges.push(cursor);
        cursor = DateRange::previous_month_of(cursor.start);
    }
    ranges
        .into_iter()
        .rev()
        .map(|r| {
            let revenue = sum_in_range(income, &r);
            let expense = sum_in_range(expenses, &r);
            MonthPoint {
                month: format!("{:04}-{:02}", r.start.year(), r.start.month()),
                revenue,
                expense,
                balance: revenue - expense,
            }
        })
        .collect()
}

/// Totals per category, largest first; ties ordered by name.
pub fn by_category<'a, T: Dated>(
    entries: &'a [T],
    category: impl Fn(&'a T) -> &'a str,
) -> Vec<(String, Decimal)> {
    let mut agg: HashMap<&str, Decimal> = HashMap::new();
    for e in entries {
        *agg.entry(category(e)).or_insert(Decimal::ZERO) += e.amount();
    }
    let mut items: Vec<(String, Decimal)> = agg
        .into_iter()
        .filter(|(_, v)| *v > Decimal::ZERO)
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn income(date: NaiveDate, cents: i64, received: bool) -> IncomeEntry {
        IncomeEntry {
            id: 0,
            user_id: 1,
            description: "venda".into(),
            amount: Decimal::new(cents, 2),
            date,
            category: "Venda Produtos".into(),
            received,
            received_date: received.then_some(date),
        }
    }

    #[test]
    fn empty_input_sums_to_zero() {
        let none: Vec<IncomeEntry> = Vec::new();
        let r = DateRange::year_of(d(2024, 6, 1));
        assert_eq!(sum_in_range(&none, &r), Decimal::ZERO);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let entries = vec![
            income(d(2024, 3, 1), 1000, true),
            income(d(2024, 3, 31), 2000, false),
            income(d(2024, 4, 1), 4000, false),
        ];
        let march = DateRange::month_of(d(2024, 3, 10));
        assert_eq!(sum_in_range(&entries, &march), Decimal::new(3000, 2));
        let single = DateRange::new(d(2024, 4, 1), d(2024, 4, 1)).unwrap();
        assert_eq!(sum_in_range(&entries, &single), Decimal::new(4000, 2));
    }

    #[test]
    fn sum_is_additive_over_disjoint_partition() {
        let entries: Vec<IncomeEntry> = (1..=28)
            .map(|day| income(d(2024, 2, day), 1234 * day as i64, day % 2 == 0))
            .collect();
        let whole = DateRange::new(d(2024, 2, 1), d(2024, 2, 28)).unwrap();
        let cuts = [
            DateRange::new(d(2024, 2, 1), d(2024, 2, 9)).unwrap(),
            DateRange::new(d(2024, 2, 10), d(2024, 2, 10)).unwrap(),
            DateRange::new(d(2024, 2, 11), d(2024, 2, 28)).unwrap(),
        ];
        let parts: Decimal = cuts.iter().map(|r| sum_in_range(&entries, r)).sum();
        assert_eq!(parts, sum_in_range(&entries, &whole));
        assert_eq!(parts, total(&entries));
    }

    #[test]
    fn percent_change_clamps_denominator() {
        assert_eq!(
            percent_change(Decimal::new(150, 0), Decimal::new(100, 0)),
            Decimal::new(50, 0)
        );
        // previous of zero divides by one
        assert_eq!(
            percent_change(Decimal::new(250, 0), Decimal::ZERO),
            Decimal::new(25000, 0)
        );
        assert_eq!(percent_change(Decimal::ZERO, Decimal::new(900, 0)), Decimal::ZERO);
    }

    #[test]
    fn summary_and_series() {
        let inc = vec![
            income(d(2024, 1, 5), 100_000, true),
            income(d(2024, 2, 5), 50_000, true),
            income(d(2024, 3, 5), 75_000, false),
        ];
        let exp = vec![ExpenseEntry {
            id: 0,
            user_id: 1,
            description: "aluguel".into(),
            amount: Decimal::new(20_000, 2),
            date: d(2024, 3, 10),
            category: "Aluguel".into(),
            paid: true,
            paid_date: Some(d(2024, 3, 10)),
        }];
        let s = monthly_summary(&inc, &exp, d(2024, 3, 20));
        assert_eq!(s.revenue, Decimal::new(75_000, 2));
        assert_eq!(s.previous_revenue, Decimal::new(50_000, 2));
        assert_eq!(s.revenue_change, Decimal::new(50, 0));
        assert_eq!(s.profit, Decimal::new(55_000, 2));
        assert_eq!(s.annual_revenue, Decimal::new(225_000, 2));

        let series = monthly_series(&inc, &exp, d(2024, 3, 1), 3);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].month, "2024-01");
        assert_eq!(series[2].balance, Decimal::new(55_000, 2));

        let b = month_breakdown(&inc[2..], &exp, &[], &[]);
        assert_eq!(b.income_pending, Decimal::new(75_000, 2));
        assert_eq!(b.income_received, Decimal::ZERO);
        assert_eq!(b.expense_paid, Decimal::new(20_000, 2));
    }

    #[test]
    fn categories_sorted_by_total() {
        let mut a = income(d(2024, 1, 1), 500, true);
        a.category = "Outras".into();
        let b = income(d(2024, 1, 2), 900, true);
        let items = by_category(&[a, b], |e| e.category.as_str());
        assert_eq!(items[0].0, "Venda Produtos");
        assert_eq!(items[1], ("Outras".to_string(), Decimal::new(500, 2)));
    }
}
