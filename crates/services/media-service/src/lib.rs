//! Media Service Library
//!
//! Ingests files into a remote object store. Each file is staged in a local
//! temporary directory, transferred, and then removed locally regardless of
//! how the transfer went.

pub mod config;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use common::AppResult;

use crate::config::MediaServiceConfig;
use crate::pipeline::{Stager, UploadPipeline};
use crate::store::CloudinaryStore;

/// Build a pipeline that uploads to Cloudinary.
pub fn build_pipeline(config: &MediaServiceConfig) -> AppResult<UploadPipeline> {
    let store = CloudinaryStore::new(config.cloudinary.clone())?;
    Ok(UploadPipeline::new(
        Stager::new(config.staging.clone()),
        Arc::new(store),
    ))
}
