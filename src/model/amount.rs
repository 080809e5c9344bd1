//! Normalization of Vietnamese-locale money strings into `Decimal` values.
//!
//! Bank notification templates render amounts in several shapes, e.g.
//! `"500.000 VND"`, `"1,234,567 VND"`, `"12,500.50 VND"`, or noisy repetitions
//! like `"0 VND 0 VND0 VND"`. This module picks the first numeric run out of
//! such text and resolves the separator ambiguity.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

/// The first contiguous run of digits, dots and commas. Any numeric-looking
/// noise ahead of the real value wins; callers accept this limitation.
fn numeric_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d.,]+").expect("invalid numeric run regex"))
}

/// Normalizes a raw localized amount string into a `Decimal`.
///
/// Rules, in order:
/// - `None`, empty, or no numeric substring: `0`.
/// - The run contains both `,` and `.`: commas are thousands separators and
///   are stripped; the dot remains the decimal point.
/// - The run contains only commas: commas are stripped (a comma is never the
///   decimal separator here).
/// - The run contains only dots and they form Vietnamese thousands grouping
///   (every group after the first is exactly three digits): dots are
///   stripped, so `"1.234.567"` -> `1234567` and `"50.000"` -> `50000`.
/// - Otherwise the run is parsed as-is.
///
/// Never fails; anything the decimal parser rejects yields `0`.
pub(crate) fn normalize_amount(text: Option<&str>) -> Decimal {
    let Some(text) = text else {
        return Decimal::ZERO;
    };
    let Some(m) = numeric_run_re().find(text) else {
        return Decimal::ZERO;
    };
    let run = m.as_str();

    let candidate = if run.contains(',') {
        run.replace(',', "")
    } else if is_dot_grouped(run) {
        run.replace('.', "")
    } else {
        run.to_string()
    };

    Decimal::from_str(&candidate).unwrap_or(Decimal::ZERO)
}

/// True when `run` looks like a dot-grouped integer, e.g. `1.234.567` or
/// `50.000`: at least one dot, a 1-3 digit leading group, and every
/// subsequent group exactly three digits.
fn is_dot_grouped(run: &str) -> bool {
    if !run.contains('.') || run.contains(',') {
        return false;
    }
    let mut groups = run.split('.');
    let Some(first) = groups.next() else {
        return false;
    };
    if first.is_empty() || first.len() > 3 || !first.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let mut any = false;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        any = true;
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_none_is_zero() {
        assert_eq!(normalize_amount(None), Decimal::ZERO);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(normalize_amount(Some("")), Decimal::ZERO);
    }

    #[test]
    fn test_no_numeric_substring_is_zero() {
        assert_eq!(normalize_amount(Some("VND")), Decimal::ZERO);
    }

    #[test]
    fn test_dot_grouped() {
        assert_eq!(normalize_amount(Some("1.234.567 VND")), dec("1234567"));
        assert_eq!(normalize_amount(Some("50.000")), dec("50000"));
        assert_eq!(normalize_amount(Some("500.000 VND")), dec("500000"));
    }

    #[test]
    fn test_comma_grouped() {
        assert_eq!(normalize_amount(Some("1,234,567 VND")), dec("1234567"));
        assert_eq!(normalize_amount(Some("200,000 VND")), dec("200000"));
    }

    #[test]
    fn test_mixed_comma_and_dot() {
        assert_eq!(normalize_amount(Some("12,500.50 VND")), dec("12500.50"));
    }

    #[test]
    fn test_plain_decimal_kept_as_is() {
        assert_eq!(normalize_amount(Some("0.5")), dec("0.5"));
        assert_eq!(normalize_amount(Some("12.5 USD")), dec("12.5"));
        assert_eq!(normalize_amount(Some("42")), dec("42"));
    }

    #[test]
    fn test_first_run_wins() {
        // Noisy repeated text: the first numeric run is taken.
        assert_eq!(normalize_amount(Some("0 VND 0 VND0 VND")), Decimal::ZERO);
        assert_eq!(
            normalize_amount(Some("ma GD 123 so tien 500 VND")),
            dec("123")
        );
    }

    #[test]
    fn test_unparsable_run_is_zero() {
        assert_eq!(normalize_amount(Some(".,.")), Decimal::ZERO);
        assert_eq!(normalize_amount(Some("1.2.3")), Decimal::ZERO);
    }
}
