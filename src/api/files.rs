//! On-disk OAuth artifacts: the downloaded `client_secret.json` and our saved
//! `token.json`. Both live in the `.secrets` directory and are written with
//! owner-only permissions.

use crate::api::OAUTH_SCOPES;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Refresh this long before the recorded expiry to absorb clock skew and
/// request latency.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// A typed JSON file that remembers where it lives.
#[derive(Debug, Clone)]
pub(crate) struct File<F>
where
    F: Serialize + DeserializeOwned,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned,
{
    pub(crate) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub(crate) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    pub(crate) async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)
            .with_context(|| format!("Failed to serialize '{}'", self.path.display()))?;
        utils::write_private(&self.path, json).await
    }

    pub(crate) fn data(&self) -> &F {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// The `client_secret.json` downloaded from the Google Cloud console for a
/// desktop-app OAuth client. Google wraps the fields in an `installed` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SecretFile {
    installed: InstalledSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstalledSecret {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_provider_x509_cert_url: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl SecretFile {
    pub(crate) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(crate) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(crate) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }

    /// The client must be a desktop-app client with a loopback redirect.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            !self.installed.client_id.is_empty(),
            "The client secret file has an empty client_id"
        );
        let has_loopback = self.installed.redirect_uris.iter().any(|uri| {
            uri.starts_with("http://localhost") || uri.starts_with("http://127.0.0.1")
        });
        if !has_loopback {
            bail!(
                "The OAuth client has no loopback redirect URI; \
                 create a 'Desktop app' client in the Google Cloud console"
            );
        }
        Ok(())
    }
}

/// Our saved OAuth token material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenFile {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    scopes: Vec<String>,
}

impl TokenFile {
    pub(crate) fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
            scopes,
        }
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(crate) fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// True once the access token is inside the expiry buffer.
    pub(crate) fn is_expired(&self) -> bool {
        Utc::now() + Duration::minutes(EXPIRY_BUFFER_MINUTES) >= self.expires_at
    }

    /// Applies a refreshed access token. The refresh token only changes when
    /// the server sends a replacement.
    pub(crate) fn update(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) {
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expires_at;
    }

    /// The token must have been granted every scope we operate with.
    pub(crate) fn validate_scopes(&self) -> Result<()> {
        for required in OAUTH_SCOPES {
            if !self.scopes.iter().any(|s| s == required) {
                bail!("The saved token is missing the '{required}' scope; re-run 'vcb auth'");
            }
        }
        Ok(())
    }
}
