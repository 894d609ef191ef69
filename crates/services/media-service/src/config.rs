//! Media service configuration.

use std::path::PathBuf;
use std::time::Duration;

use common::{optional_or, parse_or, process_env, required, AppError, AppResult};
use domain::{DEFAULT_CLOUDINARY_API_BASE, DEFAULT_REMOTE_TIMEOUT_SECONDS, DEFAULT_UPLOAD_TEMP_DIR};

use crate::pipeline::{FilenameStrategy, StagingConfig};
use crate::store::CloudinaryConfig;

/// Media service configuration.
#[derive(Debug, Clone)]
pub struct MediaServiceConfig {
    pub staging: StagingConfig,
    pub cloudinary: CloudinaryConfig,
}

impl MediaServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let filename_strategy = match lookup("UPLOAD_FILENAME_STRATEGY") {
            Some(raw) if !raw.trim().is_empty() => raw
                .parse::<FilenameStrategy>()
                .map_err(|e| AppError::configuration(format!("UPLOAD_FILENAME_STRATEGY: {}", e)))?,
            _ => FilenameStrategy::default(),
        };
        let staging = StagingConfig {
            destination_dir: PathBuf::from(optional_or(
                &lookup,
                "UPLOAD_TEMP_DIR",
                DEFAULT_UPLOAD_TEMP_DIR,
            )),
            filename_strategy,
        };

        let timeout_secs: u64 =
            parse_or(&lookup, "CLOUDINARY_TIMEOUT_SECONDS", DEFAULT_REMOTE_TIMEOUT_SECONDS)?;
        if timeout_secs == 0 {
            return Err(AppError::configuration(
                "CLOUDINARY_TIMEOUT_SECONDS must be positive",
            ));
        }
        let cloudinary = CloudinaryConfig::new(
            required(&lookup, "CLOUDINARY_CLOUD_NAME")?,
            required(&lookup, "CLOUDINARY_API_KEY")?,
            required(&lookup, "CLOUDINARY_API_SECRET")?,
        )
        .with_api_base(optional_or(
            &lookup,
            "CLOUDINARY_API_BASE",
            DEFAULT_CLOUDINARY_API_BASE,
        ))
        .with_timeout(Duration::from_secs(timeout_secs));

        Ok(Self {
            staging,
            cloudinary,
        })
    }
}
