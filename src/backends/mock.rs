//! Model-free collaborators for testing and degraded operation

use crate::error::{NobgError, Result};
use crate::transform::BackgroundRemover;
use image::{DynamicImage, Rgba, RgbaImage};
use std::time::Duration;

/// Naive background remover that needs no model files.
///
/// Samples the four corner pixels and classifies every pixel within
/// `tolerance` of any sample as background. Good enough for fixtures with a
/// distinct subject on a plain field; nowhere near a real segmentation model,
/// which is the point: it keeps the pipeline exercisable without one.
#[derive(Debug, Clone)]
pub struct CornerSampleRemover {
    tolerance: u8,
}

impl CornerSampleRemover {
    /// Create a remover with the given per-channel color tolerance
    #[must_use]
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

impl Default for CornerSampleRemover {
    fn default() -> Self {
        // Wide enough to absorb JPEG artifacts on flat backgrounds
        Self::new(12)
    }
}

impl BackgroundRemover for CornerSampleRemover {
    fn name(&self) -> &str {
        "corner-sample"
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(NobgError::transform("input raster has zero area"));
        }

        let corners = [
            *rgba.get_pixel(0, 0),
            *rgba.get_pixel(width - 1, 0),
            *rgba.get_pixel(0, height - 1),
            *rgba.get_pixel(width - 1, height - 1),
        ];

        let mut result = RgbaImage::new(width, height);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let is_background = corners
                .iter()
                .any(|corner| within_tolerance(pixel, corner, self.tolerance));
            let alpha = if is_background { 0 } else { 255 };
            result.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], alpha]));
        }
        Ok(result)
    }
}

fn within_tolerance(a: &Rgba<u8>, b: &Rgba<u8>, tolerance: u8) -> bool {
    a.0.iter()
        .take(3)
        .zip(b.0.iter().take(3))
        .all(|(&x, &y)| x.abs_diff(y) <= tolerance)
}

/// Collaborator that always fails, for exercising the error path
#[derive(Debug, Clone)]
pub struct FailingRemover {
    reason: String,
}

impl FailingRemover {
    #[must_use]
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl BackgroundRemover for FailingRemover {
    fn name(&self) -> &str {
        "failing"
    }

    fn remove_background(&self, _image: &DynamicImage) -> Result<RgbaImage> {
        Err(NobgError::transform(self.reason.clone()))
    }
}

/// Collaborator that blocks for a fixed duration before answering, for
/// exercising the deadline path
#[derive(Debug, Clone)]
pub struct SleepingRemover {
    delay: Duration,
}

impl SleepingRemover {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackgroundRemover for SleepingRemover {
    fn name(&self) -> &str {
        "sleeping"
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        std::thread::sleep(self.delay);
        Ok(image.to_rgba8())
    }
}
