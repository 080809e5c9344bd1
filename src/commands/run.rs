use crate::api::{self, Mode};
use crate::commands::Out;
use crate::pipeline::{Pipeline, RunReport};
use crate::{Config, Result};

/// Fetches and stores today's transactions once.
pub async fn run(config: &Config, mode: Mode) -> Result<Out<RunReport>> {
    let report = run_once(config, mode).await?;
    let message = format!(
        "Processed {} message(s), persisted {} new transaction(s)",
        report.count,
        report.persisted_count()
    );
    Ok(Out::new(message, report))
}

/// One full pipeline run over both notification formats. Also used by the
/// scheduler and the HTTP trigger.
pub(crate) async fn run_once(config: &Config, mode: Mode) -> Result<RunReport> {
    let mailbox = api::mailbox(config, mode).await?;
    let mut pipeline = Pipeline::new(mailbox, config.db().clone());
    pipeline
        .run(config.classic_sender(), config.digital_sender())
        .await
}
