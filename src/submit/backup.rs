//! Local backup export — the fallback when network submission fails.
//!
//! The backup file contains exactly the [`ExperimentReport`] the submitter
//! was given, pretty-printed, so no data is lost even when the endpoint is
//! unreachable.  It is offered after both submission outcomes.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::session::ExperimentReport;

// ---------------------------------------------------------------------------
// ExportError
// ---------------------------------------------------------------------------

/// Errors that can occur while writing the backup file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The report failed to serialise (should never happen in practice).
    #[error("failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The file or its parent directory could not be written.
    #[error("failed to write backup file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// BackupWriter
// ---------------------------------------------------------------------------

/// Writes the full session dataset to
/// `<dir>/shadowing_<participant-id>_<YYYY-MM-DD>.json`.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    /// Create a writer targeting `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory backups are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `report`: participant ID plus completion date.
    pub fn file_name(report: &ExperimentReport) -> String {
        format!(
            "shadowing_{}_{}.json",
            report.participant.id,
            report.completed_at.format("%Y-%m-%d")
        )
    }

    /// Serialise `report` and write it, creating the directory as needed.
    ///
    /// Returns the path of the written file.
    pub fn write(&self, report: &ExperimentReport) -> Result<PathBuf, ExportError> {
        let json = report.to_json()?;
        let path = self.dir.join(Self::file_name(report));

        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
