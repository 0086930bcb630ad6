use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::ArgMatches;

use crate::core::DATE_FORMAT;
use crate::display::{self, MonthReport};
use crate::ledger::Ledger;
use crate::settings::Settings;
use crate::summary;
use crate::txn::open_book;

fn parse_month(raw: &str) -> Result<String> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), DATE_FORMAT)
        .with_context(|| format!("month {:?} is not formatted as YYYY-MM", raw))?;

    Ok(first.format("%Y-%m").to_string())
}

/// Picks the requested month, falling back to the latest one with data.
fn pick_month(ledger: &Ledger, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(raw) => parse_month(raw),
        None => summary::latest_month(ledger)
            .ok_or_else(|| anyhow!("no transaction carries a readable date")),
    }
}

async fn months(settings: &Settings) -> Result<()> {
    let book = open_book(settings).await?;
    let months = summary::available_months(book.ledger());
    if months.is_empty() {
        println!("No data yet");
        return Ok(());
    }

    for month in months {
        println!("{}", month);
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
async fn report(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let currency = display::currency(&settings.currency)?;
    let book = open_book(settings).await?;
    let ledger = book.ledger();
    if ledger.is_empty() {
        println!("No data yet");
        return Ok(());
    }

    let month = pick_month(ledger, matches.value_of("month"))?;
    let report = MonthReport {
        month: &month,
        summary: summary::summary(ledger, &month),
        overall_balance: summary::overall_balance(ledger),
        rows: summary::month_entries(ledger, &month),
        breakdown: summary::category_breakdown(ledger, &month),
    };

    display::print_month(std::io::stdout(), &report, currency)
}

pub(crate) async fn run(name: &str, matches: &ArgMatches, settings: Settings) -> Result<()> {
    match name {
        "months" => months(&settings).await,
        "report" => report(matches, &settings).await,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, Kind};
    use crate::ledger::tests::{sample_ledger, tx};

    #[test]
    fn validates_month_argument() {
        assert_eq!(parse_month("2024-02").unwrap(), "2024-02");
        assert_eq!(parse_month("2024-2").unwrap(), "2024-02");
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("February").is_err());
        assert!(parse_month("2024-02-01").is_err());
    }

    #[test]
    fn defaults_to_latest_month() {
        let ledger = sample_ledger();

        assert_eq!(pick_month(&ledger, None).unwrap(), "2024-02");
        assert_eq!(pick_month(&ledger, Some("2023-12")).unwrap(), "2023-12");
    }

    #[test]
    fn undated_ledger_has_no_default_month() {
        let mut entry = tx(Kind::Expense, 5, Category::Other, "", "2024-01-01");
        entry.date = "someday".to_string();
        let ledger: Ledger = vec![entry].into();

        assert!(pick_month(&ledger, None).is_err());
    }
}
