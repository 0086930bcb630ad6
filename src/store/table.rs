use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;
use ulid::Ulid;

use super::{Error, Result};
use crate::core::{coerce_amount, Category, Kind, Transaction};
use crate::ledger::Ledger;

/// Column layout of the stored table. The first five columns match files
/// written before transactions carried ids.
pub(crate) const HEADER: [&str; 6] = ["type", "amount", "category", "note", "date", "id"];

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    id: Option<String>,
}

pub(crate) fn decode(data: &[u8]) -> Result<Ledger> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Ledger::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let mut seen = HashSet::new();
    let mut generated = 0;
    let mut entries = vec![];
    for record in rdr.deserialize::<Row>() {
        let row = record?;

        let id = match row
            .id
            .as_deref()
            .map(str::trim)
            .and_then(|s| Ulid::from_string(s).ok())
        {
            Some(id) if seen.insert(id) => id,
            _ => {
                generated += 1;
                Ulid::new()
            }
        };

        entries.push(Transaction {
            id,
            kind: Kind::from_stored(&row.kind),
            amount: coerce_amount(&row.amount),
            category: Category::from_stored(&row.category),
            note: row.note,
            date: row.date,
        });
    }

    if generated > 0 {
        debug!("assigned new ids to {} stored rows", generated);
    }

    Ok(Ledger::from(entries))
}

pub(crate) fn encode(ledger: &Ledger) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    wtr.write_record(HEADER)?;
    for tx in ledger.all() {
        wtr.write_record([
            tx.kind.to_string(),
            tx.amount.to_string(),
            tx.category.to_string(),
            tx.note.clone(),
            tx.date.clone(),
            tx.id.to_string(),
        ])?;
    }

    wtr.into_inner().map_err(|e| Error::Io(e.into_error()))
}
