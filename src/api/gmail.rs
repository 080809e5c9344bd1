//! Gmail REST API client backing the `Mailbox` trait.

use crate::api::{MailMessage, Mailbox, TokenProvider};
use crate::Result;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

pub(super) struct GmailMailbox {
    token_provider: TokenProvider,
    http: reqwest::Client,
}

impl GmailMailbox {
    pub(super) fn new(token_provider: TokenProvider) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build the Gmail HTTP client")?;
        Ok(Self {
            token_provider,
            http,
        })
    }

    async fn get_json<T>(&mut self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let token = self.token_provider.token_with_refresh().await?.to_string();
        debug!("GET {}", url.path());
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Request to '{}' failed", url.path()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gmail API returned {status} for '{}': {body}", url.path());
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to decode the response from '{}'", url.path()))
    }
}

#[async_trait::async_trait]
impl Mailbox for GmailMailbox {
    async fn list_messages(&mut self, query: &str) -> Result<Vec<String>> {
        let mut url = Url::parse(&format!("{GMAIL_API_BASE}/messages"))?;
        url.query_pairs_mut().append_pair("q", query);
        let list: MessageList = self
            .get_json(url)
            .await
            .with_context(|| format!("Failed to list messages for query '{query}'"))?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&mut self, id: &str) -> Result<MailMessage> {
        let mut url = Url::parse(&format!("{GMAIL_API_BASE}/messages/{id}"))?;
        url.query_pairs_mut().append_pair("format", "full");
        self.get_json(url)
            .await
            .with_context(|| format!("Failed to fetch message '{id}'"))
    }

    async fn profile(&mut self) -> Result<String> {
        let url = Url::parse(&format!("{GMAIL_API_BASE}/profile"))?;
        let profile: Profile = self
            .get_json(url)
            .await
            .context("Failed to fetch the Gmail profile")?;
        Ok(profile.email_address)
    }
}

/// `users.messages.list` response. An empty result has no `messages` key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}
