use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{table, Result, Store};
use crate::ledger::Ledger;

const TMP_SUFFIX: &str = "tmp";

/// Ledger kept as a CSV file on the local filesystem.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Store for FileStore {
    async fn load(&self) -> Result<Ledger> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => table::decode(&data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no ledger at {}, starting empty", self.path.display());
                Ok(Ledger::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, ledger: &Ledger) -> Result<()> {
        let data = table::encode(ledger)?;

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Readers only ever observe a complete table.
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            "wrote {} transactions to {}",
            ledger.len(),
            self.path.display()
        );

        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };

    path.with_extension(ext)
}
