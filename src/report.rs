//! JSON report output.

use crate::error::ReportError;
use crate::types::CheckResult;
use std::path::{Path, PathBuf};

/// Writes a report as a pretty-printed JSON array.
///
/// Fields are emitted in declaration order, so the same results always produce the same bytes.
#[derive(Clone, Debug)]
pub struct ReportSink {
    path: PathBuf,
}

impl ReportSink {
    /// Create a sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `results`, replacing any existing file and creating missing parent directories.
    pub async fn write(&self, results: &[CheckResult]) -> Result<(), ReportError> {
        let mut json = serde_json::to_vec_pretty(results)?;
        json.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| ReportError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        tokio::fs::write(&self.path, &json)
            .await
            .map_err(|source| ReportError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(
            path = %self.path.display(),
            entries = results.len(),
            "Report written"
        );
        Ok(())
    }
}
