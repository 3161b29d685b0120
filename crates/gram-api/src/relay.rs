use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Default ImageKit upload endpoint. Overridable so tests can point the
/// relay at a local mock.
pub const IMAGEKIT_UPLOAD_API: &str = "https://upload.imagekit.io/api/v1/files/upload";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("staging failed: {0}")]
    Staging(#[from] std::io::Error),

    #[error("CDN request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CDN returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("CDN returned no usable URL")]
    NoUrl,
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::UploadFailed(e.to_string())
    }
}

/// What the relay hands back on success: the public CDN URL and the
/// name the CDN stored the file under.
#[derive(Debug)]
pub struct RelayedMedia {
    pub url: String,
    pub stored_name: String,
}

/// The slice of the CDN upload reply we care about.
#[derive(Debug, Deserialize)]
struct UploadReply {
    url: Option<String>,
    name: Option<String>,
}

/// Forwards uploaded bytes to the external CDN. Incoming bytes are staged
/// to a scoped temporary file first, and that file is removed on every
/// exit path before `relay` returns.
pub struct CdnRelay {
    client: reqwest::Client,
    private_key: String,
    upload_api: String,
    staging_dir: PathBuf,
}

impl CdnRelay {
    pub async fn new(
        private_key: String,
        upload_api: String,
        staging_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(&staging_dir).await?;
        info!("Upload staging directory: {}", staging_dir.display());

        Ok(Self {
            client: reqwest::Client::new(),
            private_key,
            upload_api,
            staging_dir,
        })
    }

    /// Stage, forward, discard. The staged copy is released whether the
    /// forward succeeds or fails.
    pub async fn relay(&self, bytes: &[u8], file_name: &str) -> Result<RelayedMedia, RelayError> {
        let staged = self.stage(bytes).await?;
        let result = self.push(&staged, file_name).await;
        self.discard(&staged).await;
        result
    }

    async fn stage(&self, bytes: &[u8]) -> Result<PathBuf, RelayError> {
        let path = self.staging_dir.join(Uuid::new_v4().to_string());
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn push(&self, staged: &Path, file_name: &str) -> Result<RelayedMedia, RelayError> {
        let bytes = fs::read(staged).await?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string())
            .text("useUniqueFileName", "true");

        let resp = self
            .client
            .post(&self.upload_api)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::Status(resp.status()));
        }

        let reply: UploadReply = resp.json().await?;
        match reply.url {
            Some(url) if !url.is_empty() => {
                info!("Relayed {} to CDN", file_name);
                Ok(RelayedMedia {
                    stored_name: reply.name.unwrap_or_else(|| file_name.to_string()),
                    url,
                })
            }
            _ => Err(RelayError::NoUrl),
        }
    }

    async fn discard(&self, staged: &Path) {
        match fs::remove_file(staged).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {}: {}", staged.display(), e),
        }
    }
}
