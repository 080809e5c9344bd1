//! The extraction pipeline: enumerate today's notification emails, parse each
//! body into a draft, and persist drafts that clear the dedup gate.

use crate::api::Mailbox;
use crate::db::Db;
use crate::model::TransactionDraft;
use crate::parse::{parse_classic, parse_digital};
use crate::Result;
use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

/// The two notification templates, each with its own sender and parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFormat {
    Classic,
    Digital,
}

serde_plain::derive_display_from_serialize!(NotificationFormat);

impl NotificationFormat {
    fn parse(&self, body: &str) -> TransactionDraft {
        match self {
            NotificationFormat::Classic => parse_classic(body),
            NotificationFormat::Digital => parse_digital(body),
        }
    }
}

/// What happened to one message. Returned for every message with a decodable
/// body, whether or not its draft was persisted.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub(crate) message_id: String,
    pub(crate) format: NotificationFormat,
    pub(crate) persisted: bool,
    pub(crate) draft: TransactionDraft,
}

/// The result of one full run across both formats. Serializes to the
/// `{"count": N, "data": [...]}` shape served by the trigger endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub(crate) count: usize,
    pub(crate) data: Vec<IngestOutcome>,
}

impl RunReport {
    fn new(data: Vec<IngestOutcome>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }

    pub(crate) fn persisted_count(&self) -> usize {
        self.data.iter().filter(|o| o.persisted).count()
    }
}

pub(crate) struct Pipeline {
    mailbox: Box<dyn Mailbox + Send>,
    db: Db,
}

impl Pipeline {
    pub(crate) fn new(mailbox: Box<dyn Mailbox + Send>, db: Db) -> Self {
        Self { mailbox, db }
    }

    /// Runs one pass per format. A failed pass does not stop the other, but
    /// the first pass error is surfaced to the caller after both have run.
    pub(crate) async fn run(
        &mut self,
        classic_sender: &str,
        digital_sender: &str,
    ) -> Result<RunReport> {
        let passes = [
            (NotificationFormat::Classic, classic_sender),
            (NotificationFormat::Digital, digital_sender),
        ];
        let mut data = Vec::new();
        let mut first_error = None;
        for (format, sender) in passes {
            match self.run_pass(format, sender).await {
                Ok(mut outcomes) => data.append(&mut outcomes),
                Err(e) => {
                    error!("The {format} pass failed: {e:#}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        let report = RunReport::new(data);
        info!(
            "Processed {} message(s), persisted {}",
            report.count,
            report.persisted_count()
        );
        Ok(report)
    }

    async fn run_pass(
        &mut self,
        format: NotificationFormat,
        sender: &str,
    ) -> Result<Vec<IngestOutcome>> {
        let today = Local::now().format("%Y/%m/%d");
        let query = format!("from:{sender} after:{today}");
        debug!("Enumerating {format} messages with query '{query}'");
        let ids = self
            .mailbox
            .list_messages(&query)
            .await
            .with_context(|| format!("Failed to list {format} messages from '{sender}'"))?;
        debug!("Found {} candidate {format} message(s)", ids.len());

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.process_message(format, &id).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => warn!("Skipping message '{id}': {e:#}"),
            }
        }
        Ok(outcomes)
    }

    /// `Ok(None)` means the message carried no decodable body and was
    /// skipped without affecting the rest of the pass.
    async fn process_message(
        &mut self,
        format: NotificationFormat,
        id: &str,
    ) -> Result<Option<IngestOutcome>> {
        let message = self.mailbox.get_message(id).await?;
        trace!(subject = message.header("Subject"), "Fetched message '{id}'");
        let Some(body) = message.decoded_body() else {
            debug!("Message '{id}' has no decodable body, skipping");
            return Ok(None);
        };
        let draft = format.parse(&body);
        let persisted = ingest(&self.db, id, &draft).await?;
        Ok(Some(IngestOutcome {
            message_id: id.to_string(),
            format,
            persisted,
            draft,
        }))
    }
}

/// The persistence gate: drops zero-amount drafts, drops message ids that are
/// already stored, and inserts the rest. Returns whether a row was written.
///
/// The duplicate check and the insert are two separate store calls, so two
/// overlapping runs can both pass the check and double-insert. Runs are
/// normally serialized by the scheduler.
pub(crate) async fn ingest(db: &Db, message_id: &str, draft: &TransactionDraft) -> Result<bool> {
    if !draft.has_amount() {
        debug!("Message '{message_id}' parsed to a zero amount, not persisting");
        return Ok(false);
    }
    if db.find_by_message_id(message_id).await?.is_some() {
        debug!("Message '{message_id}' was already ingested");
        return Ok(false);
    }
    let row_id = db.create(message_id, draft).await?;
    info!("Persisted transaction {row_id} for message '{message_id}'");
    Ok(true)
}
