use thiserror::Error;
use tracing::{debug, warn};

use crate::ledger::{Ledger, LedgerError};
use crate::store::{self, Store};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error("gave up after {0} attempts, the stored ledger kept changing")]
    Exhausted(usize),
}

/// The ledger held in memory alongside the store it came from.
pub struct Book<S> {
    store: S,
    ledger: Ledger,
    max_attempts: usize,
}

impl<S: Store> Book<S> {
    pub async fn open(store: S, max_attempts: usize) -> Result<Self, Error> {
        let ledger = store.load().await?;
        debug!("opened ledger with {} transactions", ledger.len());

        Ok(Self {
            store,
            ledger,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Applies `mutation` and persists the result. When the store reports that
    /// it changed underneath, the ledger is reloaded and the mutation applied
    /// again. The in-memory ledger only changes once a save succeeds.
    pub async fn commit<F, T>(&mut self, mut mutation: F) -> Result<T, Error>
    where
        F: FnMut(&mut Ledger) -> Result<T, LedgerError>,
    {
        for attempt in 1..=self.max_attempts {
            let mut next = self.ledger.clone();
            let out = mutation(&mut next)?;

            match self.store.save(&next).await {
                Ok(()) => {
                    self.ledger = next;
                    return Ok(out);
                }
                Err(store::Error::Conflict) if attempt < self.max_attempts => {
                    warn!(attempt, "ledger changed while saving, reloading");
                    self.ledger = self.store.reload().await?;
                }
                Err(store::Error::Conflict) => break,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Exhausted(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::core::{Category, Kind};
    use crate::ledger::tests::{sample_ledger, tx};
    use crate::store::remote::tests::test_remote;
    use crate::store::table;
    use crate::summary;

    /// Store that rejects a fixed number of saves as conflicting.
    struct FlakyStore {
        stored: Mutex<Ledger>,
        conflicts: Mutex<usize>,
        saves: Mutex<usize>,
        unreachable_on_reload: bool,
    }

    impl FlakyStore {
        fn new(ledger: Ledger, conflicts: usize) -> Self {
            Self {
                stored: Mutex::new(ledger),
                conflicts: Mutex::new(conflicts),
                saves: Mutex::new(0),
                unreachable_on_reload: false,
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn load(&self) -> store::Result<Ledger> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn reload(&self) -> store::Result<Ledger> {
            if self.unreachable_on_reload {
                let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "unreachable");
                return Err(err.into());
            }

            self.load().await
        }

        async fn save(&self, ledger: &Ledger) -> store::Result<()> {
            *self.saves.lock().unwrap() += 1;
            let mut conflicts = self.conflicts.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(store::Error::Conflict);
            }

            *self.stored.lock().unwrap() = ledger.clone();
            Ok(())
        }
    }

    #[tokio::test]
    async fn commit_persists_and_updates_memory() {
        let mut book = Book::open(FlakyStore::new(sample_ledger(), 0), 3)
            .await
            .unwrap();
        let entry = tx(Kind::Expense, 40, Category::Food, "", "2024-02-11");

        let id = book.commit(|l| Ok(l.append(entry.clone()))).await.unwrap();

        assert_eq!(book.ledger().all().last().unwrap().id, id);
        assert_eq!(book.store.load().await.unwrap(), *book.ledger());
    }

    #[tokio::test]
    async fn failed_mutation_changes_nothing() {
        let mut book = Book::open(FlakyStore::new(sample_ledger(), 0), 3)
            .await
            .unwrap();
        let before = book.ledger().clone();

        let err = book.commit(|l| l.delete(10)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Ledger(LedgerError::OutOfRange { position: 10, len: 3 })
        ));
        assert_eq!(*book.ledger(), before);
        assert_eq!(*book.store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn retries_conflicts_up_to_limit() {
        let mut book = Book::open(FlakyStore::new(sample_ledger(), 2), 3)
            .await
            .unwrap();
        let target = book.ledger().all()[0].id;

        book.commit(|l| l.delete_by_id(target)).await.unwrap();

        assert_eq!(*book.store.saves.lock().unwrap(), 3);
        assert_eq!(book.ledger().len(), 2);
        assert_eq!(book.ledger().position_of(target), None);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut book = Book::open(FlakyStore::new(sample_ledger(), 5), 2)
            .await
            .unwrap();
        let before = book.ledger().clone();

        let err = book
            .commit(|l| Ok(l.append(tx(Kind::Income, 1, Category::Other, "", "2024-01-01"))))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Exhausted(2)));
        assert_eq!(*book.store.saves.lock().unwrap(), 2);
        assert_eq!(*book.ledger(), before);
    }

    #[tokio::test]
    async fn reapplies_on_fresh_remote_content() {
        let (remote, store) = test_remote().await;
        let seed = sample_ledger();
        store.save(&seed).await.unwrap();

        let mut book = Book::open(store, 3).await.unwrap();

        // Another writer appends a row between our marker read and our commit.
        let mut theirs = seed.clone();
        theirs.append(tx(Kind::Income, 500, Category::Other, "bonus", "2024-02-20"));
        remote
            .lock()
            .unwrap()
            .interlopers
            .push(table::encode(&theirs).unwrap());

        let travel = book.ledger().all()[2].id;
        book.commit(|l| {
            l.update_by_id(
                travel,
                tx(Kind::Expense, 80, Category::Travel, "train", "2024-02-01"),
            )
        })
        .await
        .unwrap();

        let stored = table::decode(remote.lock().unwrap().text().as_bytes()).unwrap();
        assert_eq!(stored, *book.ledger());
        assert_eq!(stored.len(), 4);
        assert_eq!(stored.by_id(travel).unwrap().amount, Decimal::new(80, 0));
        assert!(stored.all().iter().any(|t| t.note == "bonus"));
        assert_eq!(summary::overall_balance(&stored), Decimal::new(1000 + 500 - 200 - 80, 0));
        assert_eq!(remote.lock().unwrap().puts, 3);
    }

    #[tokio::test]
    async fn reapplied_mutation_fails_when_target_vanished() {
        let seed = sample_ledger();
        let target = seed.all()[1].id;
        let mut book = Book::open(FlakyStore::new(seed, 1), 3).await.unwrap();

        // The reloaded copy no longer holds the target.
        book.store.stored.lock().unwrap().delete_by_id(target).unwrap();

        let err = book.commit(|l| l.delete_by_id(target)).await.unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::NotFound(id)) if id == target));
        assert_eq!(book.ledger().len(), 2);
    }

    #[tokio::test]
    async fn failed_reload_writes_nothing() {
        let seed = sample_ledger();
        let mut store = FlakyStore::new(seed.clone(), 1);
        store.unreachable_on_reload = true;
        let mut book = Book::open(store, 3).await.unwrap();

        let err = book
            .commit(|l| Ok(l.append(tx(Kind::Expense, 9, Category::Food, "", "2024-02-02"))))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Store(store::Error::Io(_))));
        assert_eq!(*book.store.saves.lock().unwrap(), 1);
        assert_eq!(*book.store.stored.lock().unwrap(), seed);
        assert_eq!(*book.ledger(), seed);
    }
}
