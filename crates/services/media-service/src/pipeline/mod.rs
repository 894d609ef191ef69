//! Staging and transfer of uploaded files.

mod staging;
mod upload_pipeline;

pub use staging::{
    sanitize_filename, CleanupReport, FilenameStrategy, IncomingFile, StagedUpload, Stager,
    StagingConfig, StagingError,
};
pub use upload_pipeline::{UploadOutcome, UploadPipeline};
