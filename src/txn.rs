use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::ArgMatches;
use rust_decimal::Decimal;
use tracing::info;
use ulid::Ulid;

use crate::book::{self, Book};
use crate::core::{Category, Kind, Transaction, DATE_FORMAT};
use crate::display;
use crate::ledger::{LedgerError, Target};
use crate::settings::Settings;
use crate::store::{self, Store};

pub(crate) async fn open_book(settings: &Settings) -> Result<Book<Box<dyn Store>>> {
    let store = store::from_settings(&settings.store)?;
    Ok(Book::open(store, settings.store.max_attempts).await?)
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .with_context(|| format!("amount {:?} is not a number", raw))?;
    if amount < Decimal::ZERO {
        bail!("amount must not be negative, got {}", amount);
    }

    Ok(amount)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .with_context(|| format!("date {:?} is not formatted as YYYY-MM-DD", raw))
}

fn parse_target(matches: &ArgMatches) -> Result<Target> {
    matches
        .value_of("target")
        .ok_or_else(|| anyhow!("a transaction position or id is required"))?
        .parse::<Target>()
        .map_err(|e| anyhow!(e))
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("--{} is required", name))
}

fn entry_from_args(matches: &ArgMatches) -> Result<Transaction> {
    let kind: Kind = required(matches, "kind")?.parse()?;
    let amount = parse_amount(required(matches, "amount")?)?;
    let category: Category = required(matches, "category")?.parse()?;
    let note = matches.value_of("note").unwrap_or_default();
    let date = match matches.value_of("date") {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    Ok(Transaction::new(kind, amount, category, note, date))
}

/// Field changes passed to `edit`, validated before anything is loaded.
#[derive(Debug, Default)]
struct Edits {
    kind: Option<Kind>,
    amount: Option<Decimal>,
    category: Option<Category>,
    note: Option<String>,
    date: Option<String>,
}

impl Edits {
    fn from_args(matches: &ArgMatches) -> Result<Self> {
        let edits = Edits {
            kind: matches.value_of("kind").map(str::parse).transpose()?,
            amount: matches.value_of("amount").map(parse_amount).transpose()?,
            category: matches.value_of("category").map(str::parse).transpose()?,
            note: matches.value_of("note").map(str::to_string),
            date: matches
                .value_of("date")
                .map(|raw| parse_date(raw).map(|d| d.format(DATE_FORMAT).to_string()))
                .transpose()?,
        };

        if edits.is_empty() {
            bail!("nothing to change, pass at least one of --type, --amount, --category, --note or --date");
        }

        Ok(edits)
    }

    fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.note.is_none()
            && self.date.is_none()
    }

    /// Overlays the passed fields onto `current`, keeping the rest.
    fn apply(&self, current: &Transaction) -> Transaction {
        let mut edited = current.clone();
        if let Some(kind) = &self.kind {
            edited.kind = kind.clone();
        }
        if let Some(amount) = self.amount {
            edited.amount = amount;
        }
        if let Some(category) = &self.category {
            edited.category = category.clone();
        }
        if let Some(note) = &self.note {
            edited.note = note.clone();
        }
        if let Some(date) = &self.date {
            edited.date = date.clone();
        }

        edited
    }
}

/// Applies `edits` to whatever the transaction holds when the write happens,
/// so a retry after a conflict builds on the reloaded record.
async fn commit_edits<S: Store>(
    book: &mut Book<S>,
    id: Ulid,
    edits: &Edits,
) -> Result<(), book::Error> {
    book.commit(|ledger| {
        let current = ledger.by_id(id).ok_or(LedgerError::NotFound(id))?;
        let edited = edits.apply(current);
        ledger.update_by_id(id, edited)
    })
    .await
}

#[tracing::instrument(skip_all)]
async fn add(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let entry = entry_from_args(matches)?;
    let mut book = open_book(settings).await?;

    let id = book.commit(|ledger| Ok(ledger.append(entry.clone()))).await?;
    let position = book.ledger().position_of(id).unwrap_or_default();
    info!(%id, position, "recorded transaction");
    println!("Saved #{} ({})", position, id);

    Ok(())
}

#[tracing::instrument(skip_all)]
async fn edit(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let target = parse_target(matches)?;
    let edits = Edits::from_args(matches)?;
    let mut book = open_book(settings).await?;

    let id = book.ledger().resolve(target)?;
    commit_edits(&mut book, id, &edits).await?;
    info!(%id, "updated transaction");
    println!("Updated {}", target);

    Ok(())
}

#[tracing::instrument(skip_all)]
async fn delete(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let target = parse_target(matches)?;
    let mut book = open_book(settings).await?;

    let id = book.ledger().resolve(target)?;
    let removed = book.commit(|ledger| ledger.delete_by_id(id)).await?;
    info!(%id, "deleted transaction");
    println!(
        "Deleted {} {} {} on {}",
        removed.kind, removed.category, removed.amount, removed.date
    );

    Ok(())
}

async fn list(settings: &Settings) -> Result<()> {
    let book = open_book(settings).await?;
    if book.ledger().is_empty() {
        println!("No records yet");
        return Ok(());
    }

    let currency = display::currency(&settings.currency)?;
    display::print_ledger(std::io::stdout(), book.ledger(), currency)
}

pub(crate) async fn run(name: &str, matches: &ArgMatches, settings: Settings) -> Result<()> {
    match name {
        "add" => add(matches, &settings).await,
        "edit" => edit(matches, &settings).await,
        "delete" => delete(matches, &settings).await,
        "list" => list(&settings).await,
        _ => unreachable!(),
    }
}
