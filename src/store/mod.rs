mod file;
pub(crate) mod remote;
pub(crate) mod table;

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::Ledger;
use crate::settings::{Backend, StoreSettings};

pub use file::FileStore;
pub use remote::RemoteStore;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the stored ledger changed since its revision marker was read")]
    Conflict,
    #[error("store is not configured: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Remote(contents_api::Error),
}

impl From<contents_api::Error> for Error {
    fn from(err: contents_api::Error) -> Self {
        match err {
            contents_api::Error::Conflict => Error::Conflict,
            err => Error::Remote(err),
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;

/// Backing storage for the whole ledger. Every save rewrites the full table.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the full ledger, empty when nothing has been stored yet.
    async fn load(&self) -> Result<Ledger>;

    /// Reads the ledger again before retrying a write. Unlike `load`, a
    /// failed read is an error, since the result is about to be written back.
    async fn reload(&self) -> Result<Ledger> {
        self.load().await
    }

    async fn save(&self, ledger: &Ledger) -> Result<()>;
}

pub fn from_settings(settings: &StoreSettings) -> Result<Box<dyn Store>> {
    match settings.backend {
        Backend::File => Ok(Box::new(FileStore::new(&settings.path))),
        Backend::Remote => {
            let remote = settings.remote.as_ref().ok_or_else(|| {
                Error::Config("backend is remote but no [store.remote] section is set".into())
            })?;
            Ok(Box::new(RemoteStore::from_settings(remote)?))
        }
    }
}

#[async_trait]
impl<S: Store + ?Sized> Store for Box<S> {
    async fn load(&self) -> Result<Ledger> {
        (**self).load().await
    }

    async fn reload(&self) -> Result<Ledger> {
        (**self).reload().await
    }

    async fn save(&self, ledger: &Ledger) -> Result<()> {
        (**self).save(ledger).await
    }
}
