//! Core result types for the pipeline

use chrono::{DateTime, Utc};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Raster produced by the transform stage: same dimensions as its source,
/// alpha channel carrying the background classification.
#[derive(Debug, Clone)]
pub struct ResultImage {
    /// RGBA raster with transparent background pixels
    pub image: RgbaImage,

    /// Processing metadata (collaborator name, timings)
    pub metadata: ProcessingMetadata,
}

impl ResultImage {
    /// Create a new result image
    #[must_use]
    pub fn new(image: RgbaImage, metadata: ProcessingMetadata) -> Self {
        Self { image, metadata }
    }

    /// Image dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// View as a `DynamicImage` for encoding and display
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.image.clone())
    }

    /// Fraction of pixels classified as foreground (alpha > 0)
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        let total = self.image.pixels().len();
        if total == 0 {
            return 0.0;
        }
        let foreground = self.image.pixels().filter(|p| p[3] > 0).count();
        foreground as f32 / total as f32
    }
}

/// Timing breakdown for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Upload decoding
    pub decode_ms: u64,

    /// Background removal (the delegated call, including any queueing in the
    /// worker task)
    pub transform_ms: u64,

    /// PNG encoding (set once export has run)
    pub encode_ms: Option<u64>,

    /// End-to-end request time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Fraction of the request spent inside the collaborator
    #[must_use]
    pub fn transform_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.transform_ms as f64 / self.total_ms as f64
        }
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "total: {}ms | decode: {}ms | transform: {}ms",
            self.total_ms, self.decode_ms, self.transform_ms
        );
        if let Some(encode_ms) = self.encode_ms {
            summary.push_str(&format!(" | encode: {encode_ms}ms"));
        }
        summary
    }
}

/// Metadata about one processing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Name of the background removal collaborator that produced the result
    pub remover_name: String,

    /// When the request finished processing
    pub processed_at: DateTime<Utc>,

    /// Timing breakdown
    pub timings: ProcessingTimings,
}

impl ProcessingMetadata {
    /// Create metadata for the named collaborator
    #[must_use]
    pub fn new(remover_name: String) -> Self {
        Self {
            remover_name,
            processed_at: Utc::now(),
            timings: ProcessingTimings::default(),
        }
    }
}
