//! An in-memory `Mailbox` used for tests and offline runs (`Mode::Test`).
//!
//! Messages are held as raw HTML and re-encoded the way the Gmail API would
//! deliver them, so the decode path is exercised end to end.

use crate::api::{MailMessage, Mailbox, MessageBody, MessageHeader, MessagePart, MessagePayload};
use crate::Result;
use anyhow::bail;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

pub(crate) struct TestMailbox {
    messages: Vec<SeedMessage>,
}

pub(crate) struct SeedMessage {
    pub(crate) id: String,
    pub(crate) sender: String,
    pub(crate) subject: String,
    pub(crate) body_html: String,
}

impl TestMailbox {
    pub(crate) fn new(messages: Vec<SeedMessage>) -> Self {
        Self { messages }
    }
}

impl Default for TestMailbox {
    /// One message per notification template, addressed from the production
    /// sender addresses.
    fn default() -> Self {
        let classic = SeedMessage {
            id: "classic-0001".to_string(),
            sender: "info@info.vietcombank.com.vn".to_string(),
            subject: "Vietcombank thong bao giao dich".to_string(),
            body_html: r#"<html><body>
                <table>
                    <tr><td>Thẻ</td><td>VCB Visa x9999</td></tr>
                    <tr><td>Số tiền</td><td>120,000 VND</td></tr>
                    <tr><td>Sử dụng tại</td><td>HIGHLANDS COFFEE HN</td></tr>
                    <tr><td>Ngày, giờ giao dịch</td><td>02/01/2026 12:30:00</td></tr>
                    <tr><td>Tình trạng giao dịch</td><td>Giao dịch thành công</td></tr>
                </table>
            </body></html>"#
                .to_string(),
        };
        let digital = SeedMessage {
            id: "digital-0001".to_string(),
            sender: "VCBDigibank@info.vietcombank.com.vn".to_string(),
            subject: "Biên lai chuyển tiền".to_string(),
            body_html: r#"<html><body>
                <table>
                    <tr><td>Tài khoản nguồn</td><td>0011004xxxxx</td></tr>
                    <tr><td>Tên người hưởng</td><td>TRAN THI B</td></tr>
                    <tr><td>Tên ngân hàng hưởng</td><td>ACB</td></tr>
                    <tr><td>Số tiền</td><td>2.000.000 VND</td></tr>
                    <tr><td>Loại phí</td><td>Người chuyển trả</td></tr>
                    <tr><td>Số tiền phí</td><td>0 VND</td></tr>
                    <tr><td>Nội dung chuyển tiền</td><td>thanh toan hoa don</td></tr>
                    <tr><td>Thời gian</td><td>02/01/2026 09:15:30</td></tr>
                </table>
            </body></html>"#
                .to_string(),
        };
        Self::new(vec![classic, digital])
    }
}

#[async_trait::async_trait]
impl Mailbox for TestMailbox {
    /// Matches only on the `from:` term; the date window is ignored so seeded
    /// messages are always visible.
    async fn list_messages(&mut self, query: &str) -> Result<Vec<String>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| query.contains(&format!("from:{}", m.sender)))
            .map(|m| m.id.clone())
            .collect())
    }

    async fn get_message(&mut self, id: &str) -> Result<MailMessage> {
        let Some(seed) = self.messages.iter().find(|m| m.id == id) else {
            bail!("No test message with id '{id}'");
        };
        Ok(MailMessage {
            id: seed.id.clone(),
            snippet: None,
            payload: Some(MessagePayload {
                headers: vec![
                    MessageHeader {
                        name: "From".to_string(),
                        value: seed.sender.clone(),
                    },
                    MessageHeader {
                        name: "Subject".to_string(),
                        value: seed.subject.clone(),
                    },
                ],
                body: None,
                parts: vec![MessagePart {
                    body: Some(MessageBody {
                        data: Some(URL_SAFE.encode(&seed.body_html)),
                    }),
                }],
            }),
        })
    }

    async fn profile(&mut self) -> Result<String> {
        Ok("test@example.com".to_string())
    }
}
