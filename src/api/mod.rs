//! Mailbox access: the `Mailbox` trait seam, the Gmail implementation, and an
//! in-memory implementation used for testing and offline runs.

mod files;
mod gmail;
mod mailbox_test_client;
mod oauth;

use crate::{Config, Result};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

#[cfg(test)]
pub(crate) use mailbox_test_client::SeedMessage;
pub(crate) use mailbox_test_client::TestMailbox;
pub(crate) use oauth::TokenProvider;

/// OAuth scope required for Gmail API access. The full-mailbox scope is what
/// the Google consent screen grants for message listing and reading.
const OAUTH_SCOPES: &[&str] = &["https://mail.google.com/"];

/// Determines whether we use the real Gmail API or an in-memory test double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Gmail,
    Test,
}

impl Mode {
    /// When `VCB_SYNC_IN_TEST_MODE` is set and non-zero in length, the mode
    /// is `Mode::Test`, otherwise `Mode::Gmail`.
    pub fn from_env() -> Self {
        match std::env::var("VCB_SYNC_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Gmail,
        }
    }
}

/// The mailbox operations the pipeline needs. Implemented by `GmailMailbox`
/// for production and `TestMailbox` for offline runs and tests.
#[async_trait::async_trait]
pub(crate) trait Mailbox {
    /// Returns the ids of messages matching a Gmail search query.
    async fn list_messages(&mut self, query: &str) -> Result<Vec<String>>;

    /// Fetches one message in full, including its MIME payload.
    async fn get_message(&mut self, id: &str) -> Result<MailMessage>;

    /// Returns the email address of the authenticated account.
    async fn profile(&mut self) -> Result<String>;
}

/// Creates a `Mailbox` according to `mode`. The Gmail implementation loads
/// OAuth credentials from the configured secrets paths.
pub(crate) async fn mailbox(config: &Config, mode: Mode) -> Result<Box<dyn Mailbox + Send>> {
    match mode {
        Mode::Gmail => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(gmail::GmailMailbox::new(token_provider)?))
        }
        Mode::Test => Ok(Box::new(TestMailbox::default())),
    }
}

/// A message as returned by the Gmail API's `users.messages.get` with
/// `format=full`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MailMessage {
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) payload: Option<MessagePayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePayload {
    #[serde(default)]
    pub(crate) headers: Vec<MessageHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) body: Option<MessageBody>,
    #[serde(default)]
    pub(crate) parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) body: Option<MessageBody>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageHeader {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl MailMessage {
    /// The decoded body text: the first body part's content when the message
    /// is multipart, else the top-level body. Gmail encodes body data as
    /// URL-safe base64 (padding varies). `None` when the message has no
    /// decodable UTF-8 body.
    pub(crate) fn decoded_body(&self) -> Option<String> {
        let payload = self.payload.as_ref()?;
        let data = payload
            .parts
            .first()
            .and_then(|part| part.body.as_ref())
            .and_then(|body| body.data.as_deref())
            .or_else(|| payload.body.as_ref().and_then(|body| body.data.as_deref()))?;
        let bytes = URL_SAFE
            .decode(data)
            .or_else(|_| URL_SAFE_NO_PAD.decode(data))
            .ok()?;
        String::from_utf8(bytes).ok()
    }

    /// The value of the first header with the given name, if any.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_part(data: Option<String>, top_level: Option<String>) -> MailMessage {
        MailMessage {
            id: "m1".to_string(),
            snippet: None,
            payload: Some(MessagePayload {
                headers: vec![MessageHeader {
                    name: "Subject".to_string(),
                    value: "Biên lai chuyển tiền".to_string(),
                }],
                body: Some(MessageBody { data: top_level }),
                parts: data
                    .map(|d| {
                        vec![MessagePart {
                            body: Some(MessageBody { data: Some(d) }),
                        }]
                    })
                    .unwrap_or_default(),
            }),
        }
    }

    #[test]
    fn test_decoded_body_prefers_first_part() {
        let part = URL_SAFE.encode("<html>part</html>");
        let top = URL_SAFE.encode("<html>top</html>");
        let msg = message_with_part(Some(part), Some(top));
        assert_eq!(msg.decoded_body().as_deref(), Some("<html>part</html>"));
    }

    #[test]
    fn test_decoded_body_falls_back_to_top_level() {
        let top = URL_SAFE.encode("<html>top</html>");
        let msg = message_with_part(None, Some(top));
        assert_eq!(msg.decoded_body().as_deref(), Some("<html>top</html>"));
    }

    #[test]
    fn test_decoded_body_handles_unpadded_data() {
        let unpadded = URL_SAFE_NO_PAD.encode("<p>hi</p>");
        let msg = message_with_part(Some(unpadded), None);
        assert_eq!(msg.decoded_body().as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_decoded_body_missing() {
        let msg = message_with_part(None, None);
        assert_eq!(msg.decoded_body(), None);
        let no_payload = MailMessage::default();
        assert_eq!(no_payload.decoded_body(), None);
    }

    #[test]
    fn test_decoded_body_invalid_base64() {
        let msg = message_with_part(Some("!!not base64!!".to_string()), None);
        assert_eq!(msg.decoded_body(), None);
    }

    #[test]
    fn test_header_lookup() {
        let msg = message_with_part(None, None);
        assert_eq!(msg.header("Subject"), Some("Biên lai chuyển tiền"));
        assert_eq!(msg.header("From"), None);
    }

    #[test]
    fn test_mode_from_env_default_is_gmail() {
        // Not setting the variable in-process; the default must be Gmail.
        assert_eq!(Mode::default(), Mode::Gmail);
    }
}
