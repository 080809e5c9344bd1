//! The on-disk home directory and its `config.json`.
//!
//! Layout under the home directory (default `~/vcb`, override with
//! `$VCB_HOME` or `--home`):
//!
//! ```text
//! vcb/
//! ├── config.json
//! ├── vcb.sqlite
//! └── .secrets/
//!     ├── client_secret.json
//!     └── token.json
//! ```

use crate::db::Db;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_NAME: &str = "vcb-sync";
const CONFIG_VERSION: u32 = 1;
const CONFIG_JSON: &str = "config.json";
const SECRETS_DIR: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const SQLITE_FILE: &str = "vcb.sqlite";

const CLASSIC_SENDER: &str = "info@info.vietcombank.com.vn";
const DIGITAL_SENDER: &str = "VCBDigibank@info.vietcombank.com.vn";

/// The loaded home directory: parsed `config.json` plus an open database.
#[derive(Debug, Clone)]
pub struct Config {
    home: PathBuf,
    file: ConfigFile,
    db: Db,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    app_name: String,
    config_version: u32,
    #[serde(default = "default_classic_sender")]
    classic_sender: String,
    #[serde(default = "default_digital_sender")]
    digital_sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_classic_sender() -> String {
    CLASSIC_SENDER.to_string()
}

fn default_digital_sender() -> String {
    DIGITAL_SENDER.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            classic_sender: default_classic_sender(),
            digital_sender: default_digital_sender(),
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl Config {
    /// Creates the home directory: `config.json`, the secrets directory with
    /// a copy of the OAuth client secret, and a fresh database. Fails when
    /// a `config.json` or database already exists at `home`.
    pub async fn create(home: impl Into<PathBuf>, client_secret: &Path) -> Result<Self> {
        let home = home.into();
        let config_path = home.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }

        utils::make_dir(&home).await?;
        utils::make_dir(home.join(SECRETS_DIR)).await?;

        let secret_contents = utils::read(client_secret).await.with_context(|| {
            format!(
                "Unable to read the OAuth client secret at '{}'",
                client_secret.display()
            )
        })?;
        let secret_dest = home.join(SECRETS_DIR).join(CLIENT_SECRET_JSON);
        utils::write_private(&secret_dest, secret_contents).await?;

        let file = ConfigFile::default();
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize config")?;
        utils::write(&config_path, json).await?;

        let db = Db::init(home.join(SQLITE_FILE)).await?;
        info!("Initialized home directory at '{}'", home.display());
        Ok(Self { home, file, db })
    }

    /// Loads an initialized home directory, validating the config identity.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        let config_path = home.join(CONFIG_JSON);
        let file: ConfigFile = utils::deserialize(&config_path).await.with_context(|| {
            format!(
                "No usable config at '{}'; run 'vcb init' first",
                config_path.display()
            )
        })?;
        if file.app_name != APP_NAME {
            bail!(
                "The config at '{}' belongs to '{}', expected '{APP_NAME}'",
                config_path.display(),
                file.app_name
            );
        }
        if file.config_version != CONFIG_VERSION {
            bail!(
                "Unsupported config version {} (expected {CONFIG_VERSION})",
                file.config_version
            );
        }
        let db = Db::load(home.join(SQLITE_FILE)).await?;
        Ok(Self { home, file, db })
    }

    pub(crate) fn classic_sender(&self) -> &str {
        &self.file.classic_sender
    }

    pub(crate) fn digital_sender(&self) -> &str {
        &self.file.digital_sender
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    /// Path to the OAuth client secret, honoring a `config.json` override.
    pub(crate) fn client_secret_path(&self) -> PathBuf {
        self.file
            .client_secret_path
            .clone()
            .unwrap_or_else(|| self.home.join(SECRETS_DIR).join(CLIENT_SECRET_JSON))
    }

    /// Path to the saved OAuth token, honoring a `config.json` override.
    pub(crate) fn token_path(&self) -> PathBuf {
        self.file
            .token_path
            .clone()
            .unwrap_or_else(|| self.home.join(SECRETS_DIR).join(TOKEN_JSON))
    }
}
