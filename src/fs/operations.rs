use std::{
    ffi::OsString,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tracing::debug;

/// Reads a whole file. A missing file reads as `None`.
pub async fn read_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(content) => {
            debug!("Read {} bytes from {path:?}", content.len());
            Ok(Some(content))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the content of `path` atomically. The new content goes to a synced temporary file
/// in the same directory, which is then renamed over the target, so readers and crashes see
/// either the old or the new content. Writers from different processes are serialized by an
/// exclusive lock on a `.lock` file next to the target.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("{path:?} has no parent directory"))?
        .to_owned();

    let lock = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))
        .await?;
    lock.lock_exclusive()?;

    let target = path.to_owned();
    let content = content.to_vec();
    let result = tokio::task::spawn_blocking(move || replace(&dir, &target, &content)).await;
    lock.unlock_async().await?;
    result?
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn replace(dir: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target)?;
    debug!("Wrote {} bytes to {target:?}", content.len());
    Ok(())
}
