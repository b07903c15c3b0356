//! Report persistence. One JSON record per analysis under `REPORT_DIR`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::tailoring::pipeline::Analysis;
use crate::tailoring::report::AnalysisReport;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("report store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report record could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A persisted analysis. The id and timestamp live here, not in the report,
/// so the report itself stays byte-for-byte reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub analysis_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub report: AnalysisReport,
    pub resume_text: String,
}

impl StoredAnalysis {
    pub fn new(analysis: &Analysis, company: Option<String>, position: Option<String>) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            created_at: Utc::now(),
            company,
            position,
            report: analysis.report.clone(),
            resume_text: analysis.resume_text.clone(),
        }
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, record: &StoredAnalysis) -> Result<(), StorageError>;

    async fn load(&self, analysis_id: Uuid) -> Result<Option<StoredAnalysis>, StorageError>;
}

/// Writes `<dir>/<analysis_id>.json`.
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, analysis_id: Uuid) -> PathBuf {
        self.dir.join(format!("{analysis_id}.json"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn save(&self, record: &StoredAnalysis) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let path = self.record_path(record.analysis_id);
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, body).await.map_err(io_error(&path))?;

        info!(analysis_id = %record.analysis_id, path = %path.display(), "Saved analysis report");
        Ok(())
    }

    async fn load(&self, analysis_id: Uuid) -> Result<Option<StoredAnalysis>, StorageError> {
        let path = self.record_path(analysis_id);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
