//! Parser for the classic Vietcombank card-notification template.

use crate::model::{normalize_amount, TransactionDraft};
use crate::parse::{extract_field, flatten_text, parse_time};
use regex::Regex;
use rust_decimal::Decimal;
use scraper::Html;
use std::sync::OnceLock;

/// Literal marker for reward-credit notices. These emails carry the amount in
/// running text instead of the usual label/value table.
const REWARD_MARKER: &str = "nhận thưởng";
const REWARD_DESCRIPTION: &str = "Nhận thưởng";

fn reward_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)nhận thưởng\s+([\d.,]+)\s*(VND|USD|VNĐ)?")
            .expect("invalid reward regex")
    })
}

/// Parses a decoded classic-template email body into a draft.
///
/// The parser is deliberately forgiving: missing fields come back as `None`
/// and a missing or garbled amount yields `0`, which the persistence gate
/// drops. The flattened body text is always retained as `raw_text`.
pub(crate) fn parse_classic(body: &str) -> TransactionDraft {
    let doc = Html::parse_document(body);
    let raw_text = flatten_text(&doc);

    let mut amount = Decimal::ZERO;
    let mut description = None;

    if raw_text.contains(REWARD_MARKER) {
        if let Some(caps) = reward_re().captures(&raw_text) {
            amount = normalize_amount(caps.get(1).map(|m| m.as_str()));
            description = Some(REWARD_DESCRIPTION.to_string());
        }
    } else {
        amount = normalize_amount(extract_field(&doc, "Số tiền").as_deref());
        description = extract_field(&doc, "Tình trạng giao dịch");
    }

    // Extracted regardless of which amount branch was taken.
    let card = extract_field(&doc, "Thẻ");
    let location = extract_field(&doc, "Sử dụng tại");
    let time = extract_field(&doc, "Ngày, giờ giao dịch").and_then(|s| parse_time(&s));

    TransactionDraft {
        amount,
        description,
        time,
        card,
        location,
        raw_text,
        ..TransactionDraft::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const CLASSIC_BODY: &str = r#"<html><body>
        <p>Vietcombank trân trọng thông báo:</p>
        <table>
            <tr><td>Thẻ</td><td>VCB Visa x1234</td></tr>
            <tr><td>Số tiền</td><td>200,000 VND</td></tr>
            <tr><td>Sử dụng tại</td><td>GRAB *TRIP HCM</td></tr>
            <tr><td>Ngày, giờ giao dịch</td><td>25/12/2025 21:05:59</td></tr>
            <tr><td>Tình trạng giao dịch</td><td>Giao dịch thành công</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn test_parse_table_fields() {
        let draft = parse_classic(CLASSIC_BODY);
        assert_eq!(draft.amount, Decimal::from_str("200000").unwrap());
        assert_eq!(
            draft.description.as_deref(),
            Some("Giao dịch thành công")
        );
        assert_eq!(draft.card.as_deref(), Some("VCB Visa x1234"));
        assert_eq!(draft.location.as_deref(), Some("GRAB *TRIP HCM"));
        let expected: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 12, 25)
            .unwrap()
            .and_hms_opt(21, 5, 59)
            .unwrap();
        assert_eq!(draft.time, Some(expected));
        assert!(draft.raw_text.contains("Giao dịch thành công"));
    }

    #[test]
    fn test_reward_notice_overrides_table_fields() {
        let body = r#"<html><body>
            <p>Quý khách vừa nhận thưởng 50.000 VNĐ từ chương trình khuyến mãi.</p>
            <table>
                <tr><td>Thẻ</td><td>VCB Visa x1234</td></tr>
                <tr><td>Số tiền</td><td>999 VND</td></tr>
            </table>
        </body></html>"#;
        let draft = parse_classic(body);
        assert_eq!(draft.amount, Decimal::from_str("50000").unwrap());
        assert_eq!(draft.description.as_deref(), Some("Nhận thưởng"));
        // Table fields outside the amount branch are still extracted.
        assert_eq!(draft.card.as_deref(), Some("VCB Visa x1234"));
    }

    #[test]
    fn test_reward_notice_without_currency_unit() {
        let body = "<html><body>nhận thưởng 25.000</body></html>";
        let draft = parse_classic(body);
        assert_eq!(draft.amount, Decimal::from_str("25000").unwrap());
        assert_eq!(draft.description.as_deref(), Some("Nhận thưởng"));
    }

    #[test]
    fn test_missing_table_degrades_to_zero_amount() {
        let draft = parse_classic("<html><body><p>Thông báo chung</p></body></html>");
        assert_eq!(draft.amount, Decimal::ZERO);
        assert!(!draft.has_amount());
        assert_eq!(draft.description, None);
        assert_eq!(draft.time, None);
        assert_eq!(draft.raw_text, "Thông báo chung");
    }

    #[test]
    fn test_invalid_time_is_none() {
        let body = r#"<table>
            <tr><td>Số tiền</td><td>100,000 VND</td></tr>
            <tr><td>Ngày, giờ giao dịch</td><td>hôm nay</td></tr>
        </table>"#;
        let draft = parse_classic(body);
        assert_eq!(draft.amount, Decimal::from_str("100000").unwrap());
        assert_eq!(draft.time, None);
    }
}
