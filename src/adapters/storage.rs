use crate::domain::model::StatusRecord;
use crate::domain::ports::StatusSink;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Overwrites one local file on every write. Last writer wins.
#[derive(Debug, Clone)]
pub struct LocalFileSink {
    path: PathBuf,
}

impl LocalFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusSink for LocalFileSink {
    async fn write_status(&self, _record: &StatusRecord, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, document.as_bytes()).await?;
        tracing::debug!("Wrote {} bytes to {}", document.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
