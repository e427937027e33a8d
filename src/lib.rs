#![allow(clippy::uninlined_format_args)]

//! # nobg
//!
//! Background removal pipeline: decode an uploaded JPEG, PNG or WebP image,
//! delegate foreground/background classification to a pluggable collaborator,
//! and export the result as transparent PNG download artifacts.
//!
//! The pipeline is three stages behind one entry point:
//!
//! 1. **Intake** sniffs and decodes the upload, rejecting unsupported
//!    encodings and malformed bytes with distinct errors.
//! 2. **Transform** hands the raster to a [`BackgroundRemover`] under an
//!    explicit deadline; the collaborator is opaque to the pipeline.
//! 3. **Export** encodes the transparent raster to PNG once and offers it as
//!    two named downloads, "Standard" and "HD".
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use nobg::{backends::CornerSampleRemover, PipelineConfig, RemovalSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let remover = Arc::new(CornerSampleRemover::default());
//!     let mut session = RemovalSession::new(PipelineConfig::default(), remover);
//!
//!     let bytes = std::fs::read("photo.jpg")?;
//!     let completed = session.process_upload(Some("photo.jpg"), &bytes).await?;
//!
//!     for artifact in &completed.downloads {
//!         std::fs::write(&artifact.file_name, artifact.bytes.as_slice())?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! With the `onnx` feature enabled, [`backends::OnnxRemover`] runs a real
//! segmentation model; [`ModelFetcher`] downloads and caches the weights.
//!
//! Each [`RemovalSession`] serves exactly one upload and then refuses reuse;
//! create a session per request and share the collaborator behind an `Arc`
//! (or install it process-wide with [`install_global_remover`]).

pub mod backends;
pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod model;
pub mod progress;
pub mod session;
pub mod transform;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod tracing_config;

pub use config::{
    PipelineConfig, PipelineConfigBuilder, DEFAULT_TRANSFORM_DEADLINE, HD_FILE_NAME,
    STANDARD_FILE_NAME,
};
pub use error::{NobgError, Result};
pub use export::{encode_png, export_downloads, DownloadLabel, ExportArtifact, PNG_MIME};
pub use intake::{decode_upload, AcceptedFormat, SourceImage};
pub use model::{ModelFetcher, DEFAULT_MODEL_URL};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
pub use session::{CompletedRequest, RemovalSession, SessionState};
pub use transform::{
    global_remover, install_global_remover, transform_with_deadline, BackgroundRemover,
};
pub use types::{ProcessingMetadata, ProcessingTimings, ResultImage};

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Run the full pipeline on an in-memory upload.
///
/// Convenience wrapper that creates a single-use [`RemovalSession`] around the
/// given collaborator.
///
/// # Errors
///
/// Every pipeline error; see [`NobgError`].
pub async fn remove_background_from_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    remover: Arc<dyn BackgroundRemover>,
    config: PipelineConfig,
) -> Result<CompletedRequest> {
    let mut session = RemovalSession::new(config, remover);
    session.process_upload(file_name, bytes).await
}

/// Run the full pipeline on an upload read from an async reader.
///
/// # Errors
///
/// `NobgError::Io` when reading fails, otherwise every pipeline error.
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    file_name: Option<&str>,
    remover: Arc<dyn BackgroundRemover>,
    config: PipelineConfig,
) -> Result<CompletedRequest> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    remove_background_from_bytes(&bytes, file_name, remover, config).await
}
