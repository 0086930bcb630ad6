//! Monthly and overall aggregates over a ledger.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::core::{Category, Kind, Transaction};
use crate::ledger::Ledger;

const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthSummary {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// `YYYY-MM` for the transaction's date, `None` when the stored date text is
/// not a date.
pub fn month_key(tx: &Transaction) -> Option<String> {
    tx.parsed_date()
        .map(|date| date.format(MONTH_FORMAT).to_string())
}

fn in_month<'a>(ledger: &'a Ledger, month: &'a str) -> impl Iterator<Item = &'a Transaction> {
    ledger
        .all()
        .iter()
        .filter(move |tx| month_key(tx).as_deref() == Some(month))
}

/// Months with at least one dated transaction, oldest first.
pub fn available_months(ledger: &Ledger) -> BTreeSet<String> {
    ledger.all().iter().filter_map(month_key).collect()
}

pub fn latest_month(ledger: &Ledger) -> Option<String> {
    available_months(ledger).into_iter().next_back()
}

pub fn summary(ledger: &Ledger, month: &str) -> MonthSummary {
    let (income, expense) = totals(in_month(ledger, month));

    MonthSummary {
        income,
        expense,
        balance: income - expense,
    }
}

/// Income minus expense across the whole ledger, whatever month is being
/// reported on.
pub fn overall_balance(ledger: &Ledger) -> Decimal {
    let (income, expense) = totals(ledger.all().iter());
    income - expense
}

pub fn category_breakdown(ledger: &Ledger, month: &str) -> BTreeMap<Category, Decimal> {
    let mut breakdown = BTreeMap::new();
    for tx in in_month(ledger, month).filter(|tx| tx.is_expense()) {
        let spent = breakdown.entry(tx.category.clone()).or_insert(Decimal::ZERO);
        *spent = spent.saturating_add(tx.amount);
    }

    breakdown
}

/// Rows of the monthly report along with their ledger positions.
pub fn month_entries<'a>(ledger: &'a Ledger, month: &str) -> Vec<(usize, &'a Transaction)> {
    ledger
        .all()
        .iter()
        .enumerate()
        .filter(|(_, tx)| month_key(tx).as_deref() == Some(month))
        .collect()
}

/// Income and expense sums. Rows of an unlisted type count towards neither,
/// and sums saturate at `Decimal::MAX`.
fn totals<'a>(txs: impl Iterator<Item = &'a Transaction>) -> (Decimal, Decimal) {
    txs.fold((Decimal::ZERO, Decimal::ZERO), |(income, expense), tx| {
        match tx.kind {
            Kind::Income => (income.saturating_add(tx.amount), expense),
            Kind::Expense => (income, expense.saturating_add(tx.amount)),
            Kind::Unlisted(_) => (income, expense),
        }
    })
}
