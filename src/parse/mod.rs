//! HTML scraping primitives shared by the two notification-template parsers.
//!
//! The bank emails are label/value tables. All the brittle markup handling is
//! isolated here behind two small operations: flattening a document to plain
//! text, and looking up the value cell that follows a label cell.

mod classic;
mod digital;

pub(crate) use classic::parse_classic;
pub(crate) use digital::parse_digital;

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Timestamp layout used by both templates, e.g. `25/12/2025 21:05:59`.
const TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn td_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("invalid td selector"))
}

/// Collapses runs of whitespace to single spaces and trims.
fn trim_text(s: &str) -> String {
    ws_re().replace_all(s.trim(), " ").trim().to_string()
}

/// The full visible text of the document, whitespace-collapsed. Retained on
/// every draft as `raw_text` for audit and debugging.
pub(crate) fn flatten_text(doc: &Html) -> String {
    trim_text(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

/// Finds the first table cell whose text contains `label` (case-sensitive
/// substring match on the collapsed text) and returns the trimmed text of its
/// immediate next sibling element. `None` when no cell matches or the
/// matching cell has no following sibling.
pub(crate) fn extract_field(doc: &Html, label: &str) -> Option<String> {
    for cell in doc.select(td_selector()) {
        let text = trim_text(&cell.text().collect::<Vec<_>>().join(" "));
        if !text.contains(label) {
            continue;
        }
        return cell
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .map(|sibling| trim_text(&sibling.text().collect::<Vec<_>>().join(" ")));
    }
    None
}

/// Parses the extracted time string under the fixed `DD/MM/YYYY HH:mm:ss`
/// pattern. Nonconforming input yields `None`; a time is never fabricated.
pub(crate) fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_extract_field_returns_sibling_text() {
        let d = doc(
            "<table><tr>\
             <td>Số tiền</td><td> 500.000 VND </td>\
             </tr></table>",
        );
        assert_eq!(
            extract_field(&d, "Số tiền"),
            Some("500.000 VND".to_string())
        );
    }

    #[test]
    fn test_extract_field_substring_match() {
        let d = doc(
            "<table><tr>\
             <td><b>Số tiền giao dịch:</b></td><td>200,000 VND</td>\
             </tr></table>",
        );
        assert_eq!(extract_field(&d, "Số tiền"), Some("200,000 VND".to_string()));
    }

    #[test]
    fn test_extract_field_absent_label() {
        let d = doc("<table><tr><td>Thẻ</td><td>VCB Visa</td></tr></table>");
        assert_eq!(extract_field(&d, "Số tiền"), None);
    }

    #[test]
    fn test_extract_field_no_sibling() {
        let d = doc("<table><tr><td>Số tiền</td></tr></table>");
        assert_eq!(extract_field(&d, "Số tiền"), None);
    }

    #[test]
    fn test_extract_field_first_match_wins() {
        let d = doc(
            "<table>\
             <tr><td>Số tiền</td><td>111 VND</td></tr>\
             <tr><td>Số tiền</td><td>222 VND</td></tr>\
             </table>",
        );
        assert_eq!(extract_field(&d, "Số tiền"), Some("111 VND".to_string()));
    }

    #[test]
    fn test_flatten_text_collapses_whitespace() {
        let d = doc("<html><body><p>Giao dịch\n\n  thành   công</p></body></html>");
        assert_eq!(flatten_text(&d), "Giao dịch thành công");
    }

    #[test]
    fn test_parse_time_valid() {
        let expected: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 12, 25)
            .unwrap()
            .and_hms_opt(21, 5, 59)
            .unwrap();
        assert_eq!(parse_time("25/12/2025 21:05:59"), Some(expected));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_eq!(parse_time("2025-12-25 21:05:59"), None);
        assert_eq!(parse_time("not a time"), None);
        assert_eq!(parse_time(""), None);
    }
}
