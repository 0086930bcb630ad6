use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use rusty_money::{
    iso::{self, Currency},
    Money,
};
use tabwriter::TabWriter;

use crate::core::{Category, Kind, Transaction};
use crate::ledger::Ledger;
use crate::summary::MonthSummary;

pub fn currency(code: &str) -> Result<&'static Currency> {
    iso::find(code).ok_or_else(|| anyhow!("unknown currency code {:?}", code))
}

pub fn money(amount: Decimal, currency: &Currency) -> String {
    Money::from_decimal(amount, currency).to_string()
}

fn signed(tx: &Transaction, currency: &Currency) -> String {
    match tx.kind {
        Kind::Income => format!("+{}", money(tx.amount, currency)),
        Kind::Expense => format!("-{}", money(tx.amount, currency)),
        Kind::Unlisted(_) => money(tx.amount, currency),
    }
}

pub fn print_ledger<T: Write>(wr: T, ledger: &Ledger, currency: &Currency) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "#\tID\tDate\tType\tCategory\tNote\tAmount")?;

    for (position, tx) in ledger.all().iter().enumerate() {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            position,
            tx.id,
            tx.date,
            tx.kind,
            tx.category,
            tx.note,
            signed(tx, currency),
        )?;
    }

    tw.flush()?;

    Ok(())
}

/// A month's figures as shown by the report command.
pub struct MonthReport<'a> {
    pub month: &'a str,
    pub summary: MonthSummary,
    pub overall_balance: Decimal,
    pub rows: Vec<(usize, &'a Transaction)>,
    pub breakdown: BTreeMap<Category, Decimal>,
}

pub fn print_month<T: Write>(wr: T, report: &MonthReport<'_>, currency: &Currency) -> Result<()> {
    let mut tw = TabWriter::new(wr);

    writeln!(tw, "Month\t{}", report.month)?;
    writeln!(tw, "Income\t+{}", money(report.summary.income, currency))?;
    writeln!(tw, "Expense\t-{}", money(report.summary.expense, currency))?;
    writeln!(tw, "Month balance\t{}", money(report.summary.balance, currency))?;
    writeln!(tw, "Overall balance\t{}", money(report.overall_balance, currency))?;
    writeln!(tw)?;

    writeln!(tw, "#\tDate\tType\tCategory\tNote\tAmount")?;
    for (position, tx) in &report.rows {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}",
            position,
            tx.date,
            tx.kind,
            tx.category,
            tx.note,
            signed(tx, currency),
        )?;
    }
    writeln!(tw)?;

    if report.breakdown.is_empty() {
        writeln!(tw, "No expenses for this month")?;
    } else {
        writeln!(tw, "Category\tSpent\tShare")?;
        for (category, amount) in &report.breakdown {
            writeln!(
                tw,
                "{}\t{}\t{}%",
                category,
                money(*amount, currency),
                share(*amount, report.summary.expense),
            )?;
        }
    }

    tw.flush()?;

    Ok(())
}

fn share(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }

    (part / whole * Decimal::ONE_HUNDRED).round_dp(1)
}
