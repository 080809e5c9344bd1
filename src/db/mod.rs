//! SQLite persistence for ingested transactions.

mod migrations;

use crate::model::TransactionDraft;
use crate::Result;
use anyhow::{bail, Context};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::debug;

/// Storage layout for the transaction timestamp column.
const TIME_COLUMN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = "SELECT id, message_id, amount, description, time, card, \
     location, beneficiary_name, beneficiary_bank_name, charge_code, charge_amount, \
     raw_text, created_at FROM transactions";

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

/// A persisted transaction row. Amounts are stored as decimal strings so no
/// precision is lost to floating point.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct StoredTransaction {
    pub(crate) id: i64,
    pub(crate) message_id: String,
    pub(crate) amount: String,
    pub(crate) description: Option<String>,
    pub(crate) time: Option<String>,
    pub(crate) card: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) beneficiary_name: Option<String>,
    pub(crate) beneficiary_bank_name: Option<String>,
    pub(crate) charge_code: Option<String>,
    pub(crate) charge_amount: String,
    pub(crate) raw_text: String,
    pub(crate) created_at: String,
}

impl Db {
    /// Creates a new database file and applies the schema. Fails when a file
    /// already exists at `path`.
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database file already exists at '{}'", path.display());
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Unable to create the database at '{}'", path.display()))?;
        migrations::apply(&pool).await?;
        debug!("Created database at '{}'", path.display());
        Ok(Self { pool })
    }

    /// Opens an existing database file, applying any missing schema.
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!(
                "The database file is missing at '{}'; run 'vcb init' first",
                path.display()
            );
        }
        let options = SqliteConnectOptions::new().filename(path);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Unable to open the database at '{}'", path.display()))?;
        migrations::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// A throwaway in-memory database. The pool is capped at one connection
    /// because each SQLite memory connection is its own database.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Unable to open an in-memory database")?;
        migrations::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// The earliest persisted row for a message id, if any.
    pub(crate) async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<StoredTransaction>> {
        let sql = format!("{SELECT_COLUMNS} WHERE message_id = ?1 ORDER BY id LIMIT 1");
        sqlx::query_as::<_, StoredTransaction>(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up message '{message_id}'"))
    }

    /// Inserts a draft and returns the new row id.
    pub(crate) async fn create(&self, message_id: &str, draft: &TransactionDraft) -> Result<i64> {
        let time = draft
            .time
            .map(|t| t.format(TIME_COLUMN_FORMAT).to_string());
        let result = sqlx::query(
            "INSERT INTO transactions (message_id, amount, description, time, card, \
             location, beneficiary_name, beneficiary_bank_name, charge_code, \
             charge_amount, raw_text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(message_id)
        .bind(draft.amount.to_string())
        .bind(&draft.description)
        .bind(time)
        .bind(&draft.card)
        .bind(&draft.location)
        .bind(&draft.beneficiary_name)
        .bind(&draft.beneficiary_bank_name)
        .bind(&draft.charge_code)
        .bind(draft.charge_amount.to_string())
        .bind(&draft.raw_text)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert the transaction for message '{message_id}'"))?;
        Ok(result.last_insert_rowid())
    }

    pub(crate) async fn count_transactions(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;
        Ok(count)
    }
}
