use crate::Result;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Write a file readable only by the owner. The contents land in a sibling
/// temp file first and are renamed into place. The temp file is created with
/// owner-only permissions so the contents are never readable by others.
pub(crate) async fn write_private(
    path: impl AsRef<Path>,
    contents: impl AsRef<[u8]>,
) -> Result<()> {
    use tokio::io::AsyncWriteExt;
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options
        .open(&tmp)
        .await
        .with_context(|| format!("Unable to open '{}'", tmp.display()))?;
    file.write_all(contents.as_ref())
        .await
        .with_context(|| format!("Unable to write to '{}'", tmp.display()))?;
    file.flush()
        .await
        .with_context(|| format!("Unable to flush '{}'", tmp.display()))?;
    drop(file);
    rename(&tmp, path).await
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

/// Basically move a file. Renames `from` -> `to`.
pub(crate) async fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    tokio::fs::rename(from.as_ref(), to.as_ref())
        .await
        .with_context(|| {
            format!(
                "Unable to move file from '{}' to '{}'",
                from.as_ref().to_string_lossy(),
                to.as_ref().to_string_lossy()
            )
        })
}

/// Create a directory (and its parents) if it does not exist.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory '{}'", path.display()))
}
