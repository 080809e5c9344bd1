use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates and initializes the home directory.
pub async fn init(home: &Path, client_secret: &Path) -> Result<Out<()>> {
    Config::create(home, client_secret).await?;
    Ok(Out::new_message(format!(
        "Initialized '{}'. Next, run 'vcb auth' to authorize Gmail access.",
        home.display()
    )))
}
