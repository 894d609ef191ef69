//! Remote object store abstraction.

mod cloudinary;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::AppError;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Kind of resource the remote store detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
    Raw,
}

/// An object acknowledged by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Public URL, https when the store offers it
    pub url: String,
    pub public_id: String,
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Remote transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Remote store rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected response from remote store: {0}")]
    InvalidResponse(String),

    #[error("Could not read staged file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        AppError::transfer(err.to_string())
    }
}

/// Destination for staged files.
///
/// Implementations read the file at `local_path` and must not delete it;
/// the pipeline owns the local artifact.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<RemoteObject, TransferError>;
}
