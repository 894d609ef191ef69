//! Local staging of incoming files.
//!
//! A [`StagedUpload`] owns the temporary file it points at. The file is
//! removed by [`StagedUpload::cleanup`], which consumes the value, or by its
//! `Drop` if the value is abandoned, so it is deleted at most once and never
//! left behind. Staged files are always created exclusively: an existing file
//! in the staging directory is never opened, truncated or deleted by another
//! upload.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{DEFAULT_UPLOAD_TEMP_DIR, MAX_FILENAME_LENGTH};

/// How staged files are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameStrategy {
    /// Keep the client's (sanitized) name. Falls back to a prefixed name
    /// while another upload of the same name is still staged
    Original,
    /// Prefix the sanitized name with a random id
    #[default]
    Unique,
}

impl FromStr for FilenameStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(FilenameStrategy::Original),
            "unique" => Ok(FilenameStrategy::Unique),
            other => Err(format!("unknown filename strategy {:?}", other)),
        }
    }
}

/// Where and how files are staged.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub destination_dir: PathBuf,
    pub filename_strategy: FilenameStrategy,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            destination_dir: PathBuf::from(DEFAULT_UPLOAD_TEMP_DIR),
            filename_strategy: FilenameStrategy::default(),
        }
    }
}

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content: Bytes,
}

impl IncomingFile {
    pub fn new(original_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            original_name: original_name.into(),
            content: content.into(),
        }
    }
}

/// What happened to the local artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupReport {
    Removed,
    /// Nothing to remove (never written, or removed by someone else)
    AlreadyGone,
    Failed(String),
}

/// Staging failed; carries what happened to any partially written file.
#[derive(Debug)]
pub struct StagingError {
    pub error: AppError,
    pub cleanup: CleanupReport,
}

impl StagingError {
    /// Failure before anything was written.
    fn untouched(error: AppError) -> Self {
        Self {
            error,
            cleanup: CleanupReport::AlreadyGone,
        }
    }
}

/// A file written to the staging directory, awaiting transfer.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    original_name: String,
    size: u64,
    released: bool,
}

impl StagedUpload {
    pub fn local_path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the staged file.
    pub async fn cleanup(mut self) -> CleanupReport {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed staged file");
                CleanupReport::Removed
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CleanupReport::AlreadyGone,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
                CleanupReport::Failed(e.to_string())
            }
        }
    }

    /// Remove the file after a failed write and pair the result with `error`.
    pub async fn discard(self, error: AppError) -> StagingError {
        let cleanup = self.cleanup().await;
        StagingError { error, cleanup }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed abandoned staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove abandoned staged file"),
        }
    }
}

/// Reduce a client supplied name to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_` and the result is capped at `MAX_FILENAME_LENGTH` bytes. Returns
/// `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(&['/', '\\'][..]).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(truncate_filename(&cleaned, MAX_FILENAME_LENGTH))
    }
}

/// Shorten an ASCII file name to at most `max_len` bytes, keeping its extension.
fn truncate_filename(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < max_len => name.split_at(dot),
        _ => (name, ""),
    };
    format!("{}{}", &stem[..max_len - ext.len()], ext)
}

/// Prefix `name` with a random id, keeping the result within `MAX_FILENAME_LENGTH`.
fn unique_name(name: &str) -> String {
    let prefix = format!("{}-", Uuid::new_v4().simple());
    let rest = truncate_filename(name, MAX_FILENAME_LENGTH - prefix.len());
    format!("{}{}", prefix, rest)
}

/// Writes incoming files into the staging directory.
#[derive(Debug, Clone)]
pub struct Stager {
    config: StagingConfig,
}

impl Stager {
    pub fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Decide the on-disk name, rejecting unusable input.
    ///
    /// Touches neither the filesystem nor the network.
    pub fn staged_name(&self, file: &IncomingFile) -> AppResult<String> {
        if file.content.is_empty() {
            return Err(AppError::validation("Uploaded file is empty"));
        }
        let name = sanitize_filename(&file.original_name)
            .ok_or_else(|| AppError::validation("Uploaded file has no usable name"))?;

        Ok(match self.config.filename_strategy {
            FilenameStrategy::Original => name,
            FilenameStrategy::Unique => unique_name(&name),
        })
    }

    /// Write `file` to the staging directory, creating it if needed.
    ///
    /// A partially written file is removed before the error is returned, and
    /// the error reports how that removal went.
    pub async fn stage(&self, file: IncomingFile) -> Result<StagedUpload, StagingError> {
        let name = self.staged_name(&file).map_err(StagingError::untouched)?;
        let dir = &self.config.destination_dir;
        fs::create_dir_all(dir).await.map_err(|e| {
            StagingError::untouched(AppError::internal(format!(
                "Cannot create staging directory {}: {}",
                dir.display(),
                e
            )))
        })?;

        let (path, out) = create_exclusive(dir, name)
            .await
            .map_err(StagingError::untouched)?;
        // From here on the value owns the path
        let staged = StagedUpload {
            path,
            original_name: file.original_name,
            size: file.content.len() as u64,
            released: false,
        };

        if let Err(e) = write_all(out, &file.content).await {
            let error = AppError::internal(format!("Cannot stage {}: {}", staged.path.display(), e));
            return Err(staged.discard(error).await);
        }

        debug!(
            path = %staged.path.display(),
            size_bytes = staged.size,
            "Staged upload"
        );
        Ok(staged)
    }
}

/// Create `dir/name`, never touching a file that already exists.
///
/// If the name is taken, a prefixed name is used instead.
async fn create_exclusive(dir: &Path, name: String) -> AppResult<(PathBuf, fs::File)> {
    let path = dir.join(&name);
    match open_new(&path).await {
        Ok(out) => Ok((path, out)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let path = dir.join(unique_name(&name));
            debug!(name = %name, path = %path.display(), "Staged name taken, using a prefixed one");
            let out = open_new(&path).await.map_err(|e| {
                AppError::internal(format!("Cannot stage {}: {}", path.display(), e))
            })?;
            Ok((path, out))
        }
        Err(e) => Err(AppError::internal(format!(
            "Cannot stage {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn open_new(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

async fn write_all(mut out: fs::File, content: &[u8]) -> std::io::Result<()> {
    out.write_all(content).await?;
    out.flush().await?;
    Ok(())
}
