//! Cloudinary upload API client.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info};
use zeroize::Zeroizing;

use common::{AppError, AppResult};
use domain::{DEFAULT_CLOUDINARY_API_BASE, DEFAULT_REMOTE_TIMEOUT_SECONDS};

use super::{RemoteObject, RemoteStore, ResourceType, TransferError};

/// Cloudinary account settings.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    api_secret: Zeroizing<String>,
    /// Scheme and host, e.g. `https://api.cloudinary.com`
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: Zeroizing::new(api_secret.into()),
            api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECONDS),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/auto/upload",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

/// Request signature: hex sha1 of the sorted signed params followed by the secret.
fn signature(timestamp: i64, api_secret: &str) -> String {
    let payload = Zeroizing::new(format!("timestamp={}{}", timestamp, api_secret));
    hex::encode(Sha1::digest(payload.as_bytes()))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: Option<String>,
    url: Option<String>,
    resource_type: ResourceType,
    bytes: Option<u64>,
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Uploads staged files to Cloudinary with automatic resource type detection.
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl RemoteStore for CloudinaryStore {
    async fn upload(&self, local_path: &Path) -> Result<RemoteObject, TransferError> {
        let start = Instant::now();
        let content = tokio::fs::read(local_path).await?;
        let size = content.len();
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = Utc::now().timestamp();
        let form = Form::new()
            .part("file", Part::bytes(content).file_name(file_name))
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature(timestamp, &self.config.api_secret));

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransferError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(TransferError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| TransferError::InvalidResponse(e.to_string()))?;
        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| TransferError::InvalidResponse("response has no url".to_string()))?;

        info!(
            path = %local_path.display(),
            public_id = %body.public_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Uploaded file to Cloudinary"
        );
        debug!(url = %url, resource_type = ?body.resource_type, "Cloudinary response");

        Ok(RemoteObject {
            url,
            public_id: body.public_id,
            resource_type: body.resource_type,
            bytes: body.bytes,
            format: body.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_sha1_of_params_and_secret() {
        assert_eq!(
            signature(1315060510, "abcd"),
            "a21ad0f63beb4de2e5575204b79ab90bffb02c10"
        );
    }

    #[test]
    fn test_upload_url() {
        let config = CloudinaryConfig::new("demo", "key", "secret")
            .with_api_base("http://127.0.0.1:9999/");
        assert_eq!(config.upload_url(), "http://127.0.0.1:9999/v1_1/demo/auto/upload");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = CloudinaryConfig::new("demo", "key", "very-secret-value");
        assert!(!format!("{:?}", config).contains("very-secret-value"));
    }
}
