//! File operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::ConsoleError;

/// A file wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the whole file, or `None` if it does not exist
    pub async fn read_string_opt(&self) -> Result<Option<String>, ConsoleError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the file in place, creating parent directories
    pub async fn write_string(&self, contents: &str) -> Result<(), ConsoleError> {
        self.create_parent().await?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Write through a sibling `.tmp` file and rename it over the target.
    /// On Unix the file is owner read/write from creation.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), ConsoleError> {
        self.create_parent().await?;
        let staging = File::new(self.path.with_extension("tmp"));
        // a leftover staging file would keep its old mode
        staging.delete().await?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(staging.path()).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(staging.path(), &self.path).await?;
        Ok(())
    }

    /// Remove the file. Missing files are not an error.
    pub async fn delete(&self) -> Result<(), ConsoleError> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn create_parent(&self) -> Result<(), ConsoleError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
