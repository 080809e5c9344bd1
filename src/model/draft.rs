//! The in-memory transaction candidate extracted from one notification email.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transaction draft parsed out of a single email body. Drafts are
/// ephemeral: a draft with a zero amount is treated as unparseable noise and
/// never persisted, and a draft whose message id was already ingested is
/// dropped by the dedup gate.
///
/// The two notification formats fill different subsets of the optional
/// fields: the classic card template fills `card`/`location`, the Digibank
/// transfer template fills the beneficiary and charge fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct TransactionDraft {
    /// Parsed amount; `0` when the amount field was missing or unparsable.
    pub(crate) amount: Decimal,
    pub(crate) description: Option<String>,
    /// Transaction timestamp parsed from `DD/MM/YYYY HH:mm:ss`; `None` when
    /// the field was absent or did not conform. Never defaulted to "now".
    pub(crate) time: Option<NaiveDateTime>,
    pub(crate) card: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) beneficiary_name: Option<String>,
    pub(crate) beneficiary_bank_name: Option<String>,
    pub(crate) charge_code: Option<String>,
    pub(crate) charge_amount: Decimal,
    /// The full whitespace-collapsed body text, retained for audit.
    pub(crate) raw_text: String,
}

impl TransactionDraft {
    /// A zero-amount draft is dropped by the persistence gate.
    pub(crate) fn has_amount(&self) -> bool {
        !self.amount.is_zero()
    }
}
