//! Transform stage: delegation to the background removal collaborator
//!
//! The classification of background pixels is entirely owned by the
//! collaborator behind [`BackgroundRemover`]. This module's job is to invoke
//! it correctly: enforce the same-dimensions invariant on its output, contain
//! panics at the worker-task boundary, and apply an explicit deadline so a
//! hung collaborator cannot hang the request forever.

use crate::{
    error::{NobgError, Result},
    intake::SourceImage,
    types::{ProcessingMetadata, ResultImage},
};
use image::RgbaImage;
use instant::Instant;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// The opaque background removal collaborator.
///
/// Implementations receive a decoded raster and return a new raster of the
/// same pixel dimensions whose alpha channel renders background pixels
/// transparent. Failures are returned, never signaled by panic; a panic that
/// escapes anyway is contained by the deadline wrapper.
pub trait BackgroundRemover: Send + Sync {
    /// Short name used in logs and result metadata
    fn name(&self) -> &str;

    /// Remove the background from `image`
    ///
    /// # Errors
    ///
    /// Any failure of the underlying capability (model inference, resource
    /// exhaustion, ...) surfaces as `NobgError::Transform`.
    fn remove_background(&self, image: &image::DynamicImage) -> Result<RgbaImage>;
}

/// Invoke the collaborator synchronously and validate its output.
pub fn transform(remover: &dyn BackgroundRemover, source: &SourceImage) -> Result<ResultImage> {
    let start = Instant::now();
    let output = remover.remove_background(&source.raster)?;
    let transform_ms = start.elapsed().as_millis() as u64;

    check_dimensions(source, &output)?;

    debug!(
        remover = remover.name(),
        transform_ms,
        "background removal complete"
    );

    let mut metadata = ProcessingMetadata::new(remover.name().to_string());
    metadata.timings.transform_ms = transform_ms;
    Ok(ResultImage::new(output, metadata))
}

/// Invoke the collaborator on a blocking worker task, bounded by `deadline`.
///
/// `None` disables the deadline entirely. Expiry yields
/// [`NobgError::TransformTimeout`]; the abandoned worker task is left to
/// finish in the background since the collaborator offers no cancellation
/// hook.
///
/// # Errors
///
/// - `TransformTimeout` when the deadline expires
/// - `Transform` when the collaborator fails or panics
pub async fn transform_with_deadline(
    remover: Arc<dyn BackgroundRemover>,
    source: &SourceImage,
    deadline: Option<Duration>,
) -> Result<ResultImage> {
    let raster = source.raster.clone();
    let format = source.format;
    let byte_len = source.byte_len;
    let worker = tokio::task::spawn_blocking(move || {
        let source = SourceImage {
            raster,
            format,
            byte_len,
        };
        transform(remover.as_ref(), &source)
    });

    match deadline {
        Some(deadline) => {
            let start = Instant::now();
            match tokio::time::timeout(deadline, worker).await {
                Ok(joined) => flatten_worker(joined),
                Err(_) => {
                    warn!(deadline_ms = deadline.as_millis() as u64, "transform deadline expired");
                    Err(NobgError::TransformTimeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                        deadline_ms: deadline.as_millis() as u64,
                    })
                },
            }
        },
        None => flatten_worker(worker.await),
    }
}

fn flatten_worker(
    joined: std::result::Result<Result<ResultImage>, tokio::task::JoinError>,
) -> Result<ResultImage> {
    match joined {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => Err(NobgError::transform(
            "background removal task panicked".to_string(),
        )),
        Err(join_err) => Err(NobgError::transform(format!(
            "background removal task failed: {join_err}"
        ))),
    }
}

fn check_dimensions(source: &SourceImage, output: &RgbaImage) -> Result<()> {
    let (src_w, src_h) = source.dimensions();
    let (out_w, out_h) = output.dimensions();
    if (src_w, src_h) != (out_w, out_h) {
        return Err(NobgError::transform(format!(
            "collaborator returned {out_w}x{out_h} for a {src_w}x{src_h} input"
        )));
    }
    Ok(())
}

// The loaded collaborator is process-wide state: installed once, read-only
// afterwards, shared by reference across concurrent sessions.
static GLOBAL_REMOVER: OnceLock<Arc<dyn BackgroundRemover>> = OnceLock::new();

/// Install the process-wide collaborator. Fails if one is already installed.
///
/// # Errors
///
/// `NobgError::State` when a collaborator was installed earlier in the
/// process's lifetime.
pub fn install_global_remover(remover: Arc<dyn BackgroundRemover>) -> Result<()> {
    GLOBAL_REMOVER
        .set(remover)
        .map_err(|_| NobgError::state("a background remover is already installed"))
}

/// The process-wide collaborator, if one has been installed
#[must_use]
pub fn global_remover() -> Option<Arc<dyn BackgroundRemover>> {
    GLOBAL_REMOVER.get().cloned()
}
