//! Schema statements applied on every open. Statements are idempotent.

use crate::Result;
use anyhow::Context;
use sqlx::SqlitePool;

/// `message_id` carries no unique index; duplicate screening happens in the
/// ingest gate before the insert.
const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        description TEXT,
        time TEXT,
        card TEXT,
        location TEXT,
        beneficiary_name TEXT,
        beneficiary_bank_name TEXT,
        charge_code TEXT,
        charge_amount TEXT NOT NULL,
        raw_text TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_message_id
        ON transactions (message_id)",
];

pub(super) async fn apply(pool: &SqlitePool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to apply a schema statement")?;
    }
    Ok(())
}
