mod amount;
mod draft;

pub(crate) use amount::normalize_amount;
pub(crate) use draft::TransactionDraft;
