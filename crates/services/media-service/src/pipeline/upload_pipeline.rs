//! Upload pipeline: stage → transfer → remove local copy.
//!
//! The local artifact is removed whether or not the transfer succeeded. A
//! problem removing it is reported next to the transfer result and never
//! replaces it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use common::{AppError, AppResult};

use super::staging::{CleanupReport, IncomingFile, StagedUpload, Stager, StagingError};
use crate::store::{RemoteObject, RemoteStore};

/// Terminal state of one pass through the pipeline.
#[derive(Debug)]
pub enum UploadOutcome {
    /// No file was supplied; nothing was touched
    NoFile,
    /// Input was unusable; nothing was touched
    Rejected(AppError),
    Completed {
        object: RemoteObject,
        cleanup: CleanupReport,
    },
    Failed {
        error: AppError,
        cleanup: CleanupReport,
    },
}

impl UploadOutcome {
    /// `Ok(None)` without a file, `Ok(Some(_))` on success, the error otherwise.
    pub fn into_result(self) -> AppResult<Option<RemoteObject>> {
        match self {
            UploadOutcome::NoFile => Ok(None),
            UploadOutcome::Completed { object, .. } => Ok(Some(object)),
            UploadOutcome::Rejected(error) | UploadOutcome::Failed { error, .. } => Err(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, UploadOutcome::Completed { .. })
    }

    /// Cleanup result, for outcomes that got as far as staging.
    pub fn cleanup(&self) -> Option<&CleanupReport> {
        match self {
            UploadOutcome::Completed { cleanup, .. } | UploadOutcome::Failed { cleanup, .. } => {
                Some(cleanup)
            }
            UploadOutcome::NoFile | UploadOutcome::Rejected(_) => None,
        }
    }
}

/// Moves incoming files through local staging into a remote store.
pub struct UploadPipeline {
    stager: Stager,
    store: Arc<dyn RemoteStore>,
}

impl UploadPipeline {
    pub fn new(stager: Stager, store: Arc<dyn RemoteStore>) -> Self {
        Self { stager, store }
    }

    pub fn stager(&self) -> &Stager {
        &self.stager
    }

    /// Stage an incoming file and transfer it.
    pub async fn process(&self, file: Option<IncomingFile>) -> UploadOutcome {
        let Some(file) = file else {
            debug!("No file supplied, skipping upload");
            return UploadOutcome::NoFile;
        };

        if let Err(error) = self.stager.staged_name(&file) {
            debug!(name = %file.original_name, error = %error, "Rejected upload");
            return UploadOutcome::Rejected(error);
        }

        match self.stager.stage(file).await {
            Ok(staged) => self.transfer(Some(staged)).await,
            Err(StagingError { error, cleanup }) => {
                warn!(error = %error, cleanup = ?cleanup, "Staging failed");
                UploadOutcome::Failed { error, cleanup }
            }
        }
    }

    /// Transfer an already staged file, then remove it.
    pub async fn transfer(&self, staged: Option<StagedUpload>) -> UploadOutcome {
        let Some(staged) = staged else {
            return UploadOutcome::NoFile;
        };

        let start = Instant::now();
        let result = self.store.upload(staged.local_path()).await;
        let path = staged.local_path().display().to_string();
        let cleanup = staged.cleanup().await;

        if let CleanupReport::Failed(reason) = &cleanup {
            warn!(path = %path, reason = %reason, "Staged file left behind after transfer");
        }

        match result {
            Ok(object) => {
                info!(
                    path = %path,
                    url = %object.url,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Upload completed"
                );
                UploadOutcome::Completed { object, cleanup }
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Upload failed");
                UploadOutcome::Failed {
                    error: e.into(),
                    cleanup,
                }
            }
        }
    }
}
