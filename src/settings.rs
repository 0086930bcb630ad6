use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::CLIENT_NAME;

const CONFIG_NAME: &str = "config.toml";
const DATA_FILE_NAME: &str = "data.csv";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_MAX_ATTEMPTS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// ISO 4217 code used when printing amounts.
    pub currency: String,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub backend: Backend,
    pub path: PathBuf,
    /// Attempts made to commit a change when the remote copy keeps moving.
    pub max_attempts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    File,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_remote_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Unauthenticated copy of the file used for reads when no token is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_url: Option<String>,
    #[serde(default = "default_commit_message")]
    pub message: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_remote_path() -> String {
    DATA_FILE_NAME.to_string()
}

fn default_commit_message() -> String {
    "Update ledger".to_string()
}

impl Settings {
    /// Layers defaults, the config file and `PURSE_` prefixed environment
    /// variables, e.g. `PURSE_STORE__REMOTE__TOKEN`.
    pub fn new(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut s = Config::builder()
            .set_default("currency", DEFAULT_CURRENCY)?
            .set_default("store.backend", "file")?
            .set_default("store.path", default_data_path())?
            .set_default("store.max_attempts", DEFAULT_MAX_ATTEMPTS)?;

        if let Some(path) = config_path {
            s = s.add_source(File::with_name(path));
        } else {
            s = s.add_source(File::with_name(&default_config_path()).required(false));
        }

        s.add_source(
            Environment::with_prefix("PURSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            store: StoreSettings {
                backend: Backend::File,
                path: PathBuf::from(default_data_path()),
                max_attempts: DEFAULT_MAX_ATTEMPTS as usize,
                remote: None,
            },
        }
    }
}

fn default_data_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()))
        .join(CLIENT_NAME)
        .join(DATA_FILE_NAME)
        .display()
        .to_string()
}

pub(crate) fn default_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()))
        .join(CLIENT_NAME)
        .join(CONFIG_NAME)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_remote_settings_with_defaults() {
        let file = write_config(
            r#"
currency = "EUR"

[store]
backend = "remote"

[store.remote]
owner = "octo"
repo = "books"
"#,
        );

        let settings = Settings::new(file.path().to_str()).unwrap();

        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.store.backend, Backend::Remote);
        assert_eq!(settings.store.max_attempts, 3);

        let remote = settings.store.remote.unwrap();
        assert_eq!(remote.api_url, "https://api.github.com");
        assert_eq!(remote.path, "data.csv");
        assert_eq!(remote.branch, None);
        assert_eq!(remote.message, "Update ledger");
    }

    #[test]
    fn explicit_config_must_exist() {
        assert!(Settings::new(Some("/definitely/not/here/purse.toml")).is_err());
    }

    #[test]
    fn default_settings_serialize_to_loadable_toml() {
        let contents = toml::to_string_pretty(&Settings::default()).unwrap();
        let file = write_config(&contents);

        let settings = Settings::new(file.path().to_str()).unwrap();
        assert_eq!(settings.store.backend, Backend::File);
        assert_eq!(settings.currency, "INR");
        assert!(settings.store.remote.is_none());
    }
}
