//! OAuth 2.0 flow for the Gmail API.
//!
//! `vcb auth` runs the consent flow: we print the Google consent URL, the
//! user approves in a browser and pastes the authorization code back, and we
//! exchange it for tokens which are saved to `token.json`. After that the
//! provider refreshes the access token silently whenever it nears expiry.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Loopback redirect for a desktop-app client. Google shows the code to the
/// user when the redirect cannot be served, so no callback server is needed.
const REDIRECT_URI: &str = "http://localhost";

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the OAuth client secret and token files and produces valid access
/// tokens on demand.
#[derive(Debug)]
pub(crate) struct TokenProvider {
    secret: File<SecretFile>,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Runs the interactive consent flow and writes a fresh `token.json`.
    pub(crate) async fn initialize(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret = File::<SecretFile>::load(secret_path).await?;
        secret.data().validate()?;
        let client = oauth_client(secret.data())?;

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in OAUTH_SCOPES {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        let (auth_url, _csrf) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        info!("Open this URL in your browser and approve access:");
        info!("{auth_url}");
        info!("Then paste the authorization code here and press enter.");
        let code = tokio::task::spawn_blocking(read_code)
            .await
            .context("The stdin reader task failed")??;

        let http = http_client()?;
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&http)
            .await
            .context("Failed to exchange the authorization code for tokens")?;

        let scopes = response
            .scopes()
            .map(|s| s.iter().map(|scope| scope.to_string()).collect())
            .unwrap_or_else(|| OAUTH_SCOPES.iter().map(|s| (*s).to_string()).collect());
        let token_file = TokenFile::new(
            response.access_token().secret().to_string(),
            response.refresh_token().map(|t| t.secret().to_string()),
            expires_at(response.expires_in()),
            scopes,
        );
        token_file.validate_scopes()?;

        let token = File::new(token_path, token_file);
        token.save().await?;
        info!("Tokens saved to '{}'", token.path().display());

        Ok(Self { secret, token })
    }

    /// Loads previously saved credentials. Fails with a pointer to `vcb auth`
    /// when the token file is missing or was granted the wrong scopes.
    pub(crate) async fn load(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret = File::<SecretFile>::load(secret_path).await?;
        secret.data().validate()?;
        let token = File::<TokenFile>::load(token_path)
            .await
            .context("No saved OAuth token was found; run 'vcb auth' first")?;
        token.data().validate_scopes()?;
        Ok(Self { secret, token })
    }

    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// The current access token, refreshed first when it is near expiry.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let refresh_token = self
            .token
            .data()
            .refresh_token()
            .ok_or_else(|| anyhow!("The saved token has no refresh token; re-run 'vcb auth'"))?
            .to_string();

        let client = oauth_client(self.secret.data())?;
        let http = http_client()?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&http)
            .await
            .context("Failed to refresh the OAuth access token")?;

        let expires_at = expires_at(response.expires_in());
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            response.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
        );
        self.token.save().await?;
        debug!("Access token refreshed, valid until {expires_at}");
        Ok(())
    }
}

fn oauth_client(secret: &SecretFile) -> Result<OAuthClient> {
    let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(
            AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?,
        )
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        )
        .set_redirect_uri(
            RedirectUrl::new(REDIRECT_URI.to_string()).context("Invalid redirect URI")?,
        );
    Ok(client)
}

fn http_client() -> Result<oauth2::reqwest::Client> {
    oauth2::reqwest::ClientBuilder::new()
        .redirect(oauth2::reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build the OAuth HTTP client")
}

fn read_code() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read the authorization code from stdin")?;
    Ok(line.trim().to_string())
}

fn expires_at(expires_in: Option<std::time::Duration>) -> DateTime<Utc> {
    let lifetime = expires_in
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .unwrap_or_else(|| chrono::Duration::minutes(55));
    Utc::now() + lifetime
}
