use async_trait::async_trait;
use contents_api::{Client, Commit, Resource};
use tracing::{debug, info, warn};
use url::Url;

use super::{table, Error, Result, Store};
use crate::ledger::Ledger;
use crate::settings::RemoteSettings;

/// Ledger kept as a file in a hosted repository, written through the
/// repository contents api.
pub struct RemoteStore {
    client: Client,
    resource: Resource,
    mirror: Option<Url>,
    message: String,
}

impl RemoteStore {
    pub fn new(client: Client, resource: Resource, mirror: Option<Url>, message: String) -> Self {
        Self {
            client,
            resource,
            mirror,
            message,
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Result<Self> {
        let api = Url::parse(&settings.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url {:?}: {}", settings.api_url, e)))?;
        let mirror = settings
            .mirror_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| Error::Config(format!("invalid mirror_url {:?}: {}", raw, e)))
            })
            .transpose()?;

        Ok(Self::new(
            Client::new(api, settings.token.clone()),
            Resource {
                owner: settings.owner.clone(),
                repo: settings.repo.clone(),
                path: settings.path.clone(),
                branch: settings.branch.clone(),
            },
            mirror,
            settings.message.clone(),
        ))
    }

    async fn fetch(&self) -> std::result::Result<Option<Vec<u8>>, contents_api::Error> {
        match &self.mirror {
            Some(mirror) if !self.client.has_credential() => self.client.get_raw(mirror).await,
            _ => Ok(self.client.get(&self.resource).await?.map(|blob| blob.content)),
        }
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn load(&self) -> Result<Ledger> {
        match self.fetch().await {
            Ok(Some(data)) => table::decode(&data),
            Ok(None) => {
                debug!("{} does not exist yet, starting empty", self.resource.path);
                Ok(Ledger::new())
            }
            Err(e) => {
                warn!("unable to fetch {}, starting empty: {}", self.resource.path, e);
                Ok(Ledger::new())
            }
        }
    }

    async fn reload(&self) -> Result<Ledger> {
        match self.client.get(&self.resource).await? {
            Some(blob) => table::decode(&blob.content),
            None => Ok(Ledger::new()),
        }
    }

    async fn save(&self, ledger: &Ledger) -> Result<()> {
        // The marker must be current, a failed read aborts the write.
        let current = self.client.get(&self.resource).await?;
        let content = table::encode(ledger)?;

        let sha = self
            .client
            .put(
                &self.resource,
                &Commit {
                    message: &self.message,
                    content: &content,
                    sha: current.as_ref().map(|blob| blob.sha.as_str()),
                },
            )
            .await?;
        info!(
            "committed {} transactions to {} at {}",
            ledger.len(),
            self.resource.path,
            sha
        );

        Ok(())
    }
}
