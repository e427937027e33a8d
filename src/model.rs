//! Model acquisition: download and cache segmentation models
//!
//! Models are fetched over HTTPS into a per-user cache directory keyed by the
//! SHA-256 of the source URL, so repeated runs reuse the cached file and two
//! different URLs never collide. Downloads stream to a temporary file and are
//! persisted atomically, so an interrupted download never poisons the cache.

use crate::error::{NobgError, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// General-purpose ISNet segmentation model, the default collaborator weights
pub const DEFAULT_MODEL_URL: &str =
    "https://huggingface.co/imgly/isnet-general-onnx/resolve/main/onnx/model.onnx";

/// Downloads models and caches them on disk.
pub struct ModelFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl ModelFetcher {
    /// Fetcher using the platform cache directory (`~/.cache/nobg/models` on
    /// Linux).
    ///
    /// # Errors
    ///
    /// `NobgError::Model` when no cache directory can be determined.
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| NobgError::model("no cache directory available on this platform"))?
            .join("nobg")
            .join("models");
        Ok(Self::with_cache_dir(cache_dir))
    }

    /// Fetcher caching into an explicit directory
    #[must_use]
    pub fn with_cache_dir<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache path a URL resolves to
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        self.cache_dir.join(format!("{digest:x}.onnx"))
    }

    /// Whether a URL is already cached
    #[must_use]
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache_path(url).exists()
    }

    /// Fetch a model, returning the cached path. Hits the network only on a
    /// cache miss.
    ///
    /// # Errors
    ///
    /// `NobgError::Model` for network failures, non-success HTTP statuses, and
    /// cache I/O failures.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let target = self.cache_path(url);
        if target.exists() {
            debug!(url, path = %target.display(), "model cache hit");
            return Ok(target);
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(|e| {
            NobgError::model(format!(
                "failed to create cache directory '{}': {e}",
                self.cache_dir.display()
            ))
        })?;

        info!(url, "downloading model");
        self.download_to(url, &target).await?;
        info!(path = %target.display(), "model cached");
        Ok(target)
    }

    async fn download_to(&self, url: &str, target: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NobgError::model(format!("request to '{url}' failed: {e}")))?;

        if !response.status().is_success() {
            return Err(NobgError::model(format!(
                "download of '{url}' failed with status {}",
                response.status()
            )));
        }

        let mut temp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| NobgError::model(format!("failed to create temporary file: {e}")))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| NobgError::model(format!("download stream failed: {e}")))?;
            temp.write_all(&chunk)
                .map_err(|e| NobgError::model(format!("failed to write model data: {e}")))?;
            written += chunk.len() as u64;
        }

        if written == 0 {
            return Err(NobgError::model(format!("download of '{url}' was empty")));
        }

        temp.persist(target)
            .map_err(|e| NobgError::model(format!("failed to persist model file: {e}")))?;
        debug!(bytes = written, "model download finished");
        Ok(())
    }
}
