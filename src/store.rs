use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tokio::fs;

use crate::{parser::strip_bom, prelude::*};

/// Raw feed snapshots on disk, one file per calendar date.
///
/// Each file holds the whole unfiltered feed, shared by every provider and tariff.
#[must_use]
#[derive(Clone, Debug)]
pub struct LocalStore {
    directory: PathBuf,
}

impl LocalStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn path_of(&self, on: NaiveDate) -> PathBuf {
        self.directory.join(format!("prices_{}.csv", on.format("%Y-%m-%d")))
    }

    #[instrument(skip_all, fields(on = %on))]
    pub async fn save(&self, on: NaiveDate, content: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| StoreError { path: self.directory.clone(), source })?;
        let path = self.path_of(on);
        fs::write(&path, content).await.map_err(|source| StoreError { path: path.clone(), source })?;
        debug!(path = %path.display(), n_bytes = content.len(), "saved");
        Ok(())
    }

    /// Load the snapshot, or `None` if there is none for the date.
    #[instrument(skip_all, fields(on = %on))]
    pub async fn load(&self, on: NaiveDate) -> Result<Option<String>, StoreError> {
        let path = self.path_of(on);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(path = %path.display(), n_bytes = content.len(), "loaded");
                Ok(Some(strip_bom(&content).to_owned()))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError { path, source }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to access `{}`", path.display())]
pub struct StoreError {
    pub path: PathBuf,

    #[source]
    pub source: io::Error,
}
