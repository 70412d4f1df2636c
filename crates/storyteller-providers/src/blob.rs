//! Blob store writing audio files to a local directory served over HTTP.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use storyteller_core::speech::{BlobStore, SynthesisError};
use tokio::fs;
use tracing::debug;

/// Writes each blob into `dir` under the last segment of its key and
/// returns `{url_prefix}/{file name}`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SynthesisError> {
        let file_name = Path::new(key)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SynthesisError::Storage(format!("invalid blob key: {key}")))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|error| SynthesisError::Storage(error.to_string()))?;
        let size = bytes.len();
        fs::write(self.dir.join(file_name), bytes)
            .await
            .map_err(|error| SynthesisError::Storage(error.to_string()))?;
        debug!(key, content_type, size, "blob stored");

        Ok(format!(
            "{}/{file_name}",
            self.url_prefix.trim_end_matches('/')
        ))
    }
}
