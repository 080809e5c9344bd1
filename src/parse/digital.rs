//! Parser for the VCB Digibank transfer-notification template.

use crate::model::{normalize_amount, TransactionDraft};
use crate::parse::{extract_field, flatten_text, parse_time};
use scraper::Html;

/// Parses a decoded Digibank-template email body into a draft.
///
/// Unlike the classic template there is no special-case branch; every field
/// is a straight label/value lookup. Missing fields come back `None` and
/// missing amounts come back `0`.
pub(crate) fn parse_digital(body: &str) -> TransactionDraft {
    let doc = Html::parse_document(body);
    let raw_text = flatten_text(&doc);

    let card = extract_field(&doc, "Tài khoản nguồn");
    let amount = normalize_amount(extract_field(&doc, "Số tiền").as_deref());
    let description = extract_field(&doc, "Nội dung chuyển tiền");
    let beneficiary_name = extract_field(&doc, "Tên người hưởng");
    let beneficiary_bank_name = extract_field(&doc, "Tên ngân hàng hưởng");
    let charge_code = extract_field(&doc, "Loại phí");
    let charge_amount = normalize_amount(extract_field(&doc, "Số tiền phí").as_deref());
    let time = extract_field(&doc, "Thời gian").and_then(|s| parse_time(&s));

    TransactionDraft {
        amount,
        description,
        time,
        card,
        beneficiary_name,
        beneficiary_bank_name,
        charge_code,
        charge_amount,
        raw_text,
        ..TransactionDraft::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const DIGITAL_BODY: &str = r#"<html><body>
        <table>
            <tr><td>Tài khoản nguồn</td><td>0011004xxxxx</td></tr>
            <tr><td>Tên người hưởng</td><td>NGUYEN VAN A</td></tr>
            <tr><td>Tên ngân hàng hưởng</td><td>Techcombank</td></tr>
            <tr><td>Số tiền</td><td>1.500.000 VND</td></tr>
            <tr><td>Loại phí</td><td>Người chuyển trả</td></tr>
            <tr><td>Số tiền phí</td><td>2,200 VND</td></tr>
            <tr><td>Nội dung chuyển tiền</td><td>tra tien nha thang 12</td></tr>
            <tr><td>Thời gian</td><td>01/12/2025 08:30:00</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn test_parse_all_fields() {
        let draft = parse_digital(DIGITAL_BODY);
        assert_eq!(draft.card.as_deref(), Some("0011004xxxxx"));
        assert_eq!(draft.amount, Decimal::from_str("1500000").unwrap());
        assert_eq!(draft.description.as_deref(), Some("tra tien nha thang 12"));
        assert_eq!(draft.beneficiary_name.as_deref(), Some("NGUYEN VAN A"));
        assert_eq!(draft.beneficiary_bank_name.as_deref(), Some("Techcombank"));
        assert_eq!(draft.charge_code.as_deref(), Some("Người chuyển trả"));
        assert_eq!(draft.charge_amount, Decimal::from_str("2200").unwrap());
        assert_eq!(
            draft.time,
            Some(
                NaiveDate::from_ymd_opt(2025, 12, 1)
                    .unwrap()
                    .and_hms_opt(8, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(draft.location, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let body = r#"<table>
            <tr><td>Số tiền</td><td>300,000 VND</td></tr>
        </table>"#;
        let draft = parse_digital(body);
        assert_eq!(draft.amount, Decimal::from_str("300000").unwrap());
        assert_eq!(draft.charge_amount, Decimal::ZERO);
        assert_eq!(draft.description, None);
        assert_eq!(draft.beneficiary_name, None);
        assert_eq!(draft.time, None);
    }

    #[test]
    fn test_empty_body_degrades_to_zero_amount() {
        let draft = parse_digital("<html><body></body></html>");
        assert!(!draft.has_amount());
        assert_eq!(draft.raw_text, "");
    }
}
