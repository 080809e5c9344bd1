use crate::api::{self, Mode, TokenProvider};
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;

/// Runs the interactive OAuth consent flow and saves the resulting tokens.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    TokenProvider::initialize(config.client_secret_path(), config.token_path()).await?;
    Ok(Out::new_message(
        "Authorization succeeded. You can now run 'vcb run' or 'vcb serve'.",
    ))
}

/// Checks the saved credentials by refreshing the access token and querying
/// the Gmail profile.
pub async fn auth_verify(config: &Config, mode: Mode) -> Result<Out<()>> {
    if mode == Mode::Gmail {
        let mut provider =
            TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
        provider.refresh().await?;
    }
    let mut mailbox = api::mailbox(config, mode).await?;
    let address = mailbox
        .profile()
        .await
        .context("Unable to query the Gmail profile; try re-running 'vcb auth'")?;
    Ok(Out::new_message(format!(
        "Authentication is valid for {address}"
    )))
}
