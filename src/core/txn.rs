use std::fmt;
use std::str::FromStr;

use chrono::naive::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use ulid::Ulid;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown transaction type {0:?}, expected Income or Expense")]
    Kind(String),
    #[error("unknown category {0:?}, expected one of Salary, Food, Travel, Shopping, Bills, Other")]
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Income,
    Expense,
    /// A stored type that is neither, kept as written and left out of totals.
    Unlisted(String),
}

impl Kind {
    /// Reads a stored type without rejecting unknown values.
    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Kind::Unlisted(s.to_string()))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Income => "Income",
            Kind::Expense => "Expense",
            Kind::Unlisted(raw) => raw,
        })
    }
}

impl FromStr for Kind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Kind::Income),
            "expense" => Ok(Kind::Expense),
            _ => Err(ParseError::Kind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Salary,
    Food,
    Travel,
    Shopping,
    Bills,
    Other,
    /// A stored value outside the known set, kept as written.
    Unlisted(String),
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Salary,
        Category::Food,
        Category::Travel,
        Category::Shopping,
        Category::Bills,
        Category::Other,
    ];

    /// Reads a stored category. Unknown values are carried through rather than
    /// rejected.
    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Category::Unlisted(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Salary => "Salary",
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Other => "Other",
            Category::Unlisted(raw) => raw,
        })
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Category(s.to_string()))
    }
}

/// Coerces free-form amount text into a non-negative decimal. Anything that is
/// not a finite, non-negative number becomes zero.
pub fn coerce_amount(raw: &str) -> Decimal {
    let raw = raw.trim();
    if raw.contains('_') {
        return Decimal::ZERO;
    }

    let parsed = raw.parse::<Decimal>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Decimal::from_f64)
    });

    parsed.map_or(Decimal::ZERO, |amount| amount.max(Decimal::ZERO))
}

/// Reads the stored date text. Accepts plain dates and the timestamp forms
/// spreadsheet tools tend to write back.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: Ulid,
    pub kind: Kind,
    pub amount: Decimal,
    pub category: Category,
    pub note: String,
    /// Date text as stored. Entered dates are always `YYYY-MM-DD`.
    pub date: String,
}

impl Transaction {
    pub fn new(
        kind: Kind,
        amount: Decimal,
        category: Category,
        note: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Ulid::new(),
            kind,
            amount: amount.max(Decimal::ZERO),
            category,
            note: note.into(),
            date: date.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == Kind::Expense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_amounts() {
        let tests = vec![
            ("1000", Decimal::new(1000, 0)),
            (" 12.50 ", Decimal::new(1250, 2)),
            ("1e3", Decimal::new(1000, 0)),
            ("abc", Decimal::ZERO),
            ("", Decimal::ZERO),
            ("NaN", Decimal::ZERO),
            ("inf", Decimal::ZERO),
            ("-40", Decimal::ZERO),
            ("1_000", Decimal::ZERO),
        ];

        for t in tests {
            assert_eq!(coerce_amount(t.0), t.1, "input {:?}", t.0);
        }
    }

    #[test]
    fn parses_kind_case_insensitively() {
        assert_eq!("income".parse::<Kind>().unwrap(), Kind::Income);
        assert_eq!("Expense".parse::<Kind>().unwrap(), Kind::Expense);
        assert_eq!(
            "refund".parse::<Kind>().unwrap_err(),
            ParseError::Kind("refund".to_string())
        );
    }

    #[test]
    fn stored_kinds_are_kept_as_written() {
        assert_eq!(Kind::from_stored("income"), Kind::Income);
        assert_eq!(Kind::from_stored(""), Kind::Unlisted(String::new()));
        assert_eq!(Kind::from_stored("Transfer").to_string(), "Transfer");
        assert!("Transfer".parse::<Kind>().is_err());
    }

    #[test]
    fn entry_categories_are_closed() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert!("Groceries".parse::<Category>().is_err());
    }

    #[test]
    fn stored_categories_are_advisory() {
        assert_eq!(Category::from_stored("Bills"), Category::Bills);
        assert_eq!(
            Category::from_stored("Groceries"),
            Category::Unlisted("Groceries".to_string())
        );
        assert_eq!(Category::from_stored("Groceries").to_string(), "Groceries");
    }

    #[test]
    fn parses_stored_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_date("2024-01-05"), expected);
        assert_eq!(parse_date("2024-01-05 00:00:00"), expected);
        assert_eq!(parse_date("2024-01-05T10:30:00"), expected);
        assert_eq!(parse_date("05/01/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn new_transaction_formats_date_and_clamps_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let tx = Transaction::new(Kind::Expense, Decimal::new(-5, 0), Category::Travel, "", date);

        assert_eq!(tx.date, "2024-02-01");
        assert_eq!(tx.amount, Decimal::ZERO);
        assert_eq!(tx.parsed_date(), Some(date));
    }
}
