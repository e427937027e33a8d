//! Export stage: PNG encoding and download artifacts
//!
//! A transformed raster is encoded to PNG exactly once; the two offered
//! downloads ("Standard" and "HD") are distinct artifacts backed by the same
//! encoded bytes. PNG is the only export encoding since it is the only
//! accepted one with lossless alpha.

use crate::{
    config::PipelineConfig,
    error::{NobgError, Result},
    types::ResultImage,
};
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// MIME type of every export artifact
pub const PNG_MIME: &str = "image/png";

/// Which of the two offered downloads an artifact backs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadLabel {
    Standard,
    Hd,
}

impl DownloadLabel {
    /// Button caption shown next to the download
    #[must_use]
    pub fn caption(self) -> &'static str {
        match self {
            Self::Standard => "Download Image",
            Self::Hd => "Download HD Image",
        }
    }
}

impl std::fmt::Display for DownloadLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Hd => write!(f, "HD"),
        }
    }
}

/// One downloadable export: a file name, a MIME type, and the PNG bytes.
///
/// Bytes are shared, not copied, between artifacts of the same request.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub label: DownloadLabel,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Arc<Vec<u8>>,
}

impl ExportArtifact {
    /// Size of the encoded PNG in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Encode a transformed raster to PNG bytes.
///
/// # Errors
///
/// `NobgError::Encode` when the PNG encoder fails.
pub fn encode_png(result: &ResultImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    result
        .to_dynamic()
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| NobgError::encode(format!("PNG encoding failed: {e}")))?;
    Ok(buffer)
}

/// Produce the two download artifacts for a transformed raster.
///
/// # Errors
///
/// `NobgError::Encode` when PNG encoding fails; in that case no artifact is
/// produced at all.
pub fn export_downloads(
    result: &ResultImage,
    config: &PipelineConfig,
) -> Result<[ExportArtifact; 2]> {
    let bytes = Arc::new(encode_png(result)?);

    debug!(
        byte_len = bytes.len(),
        standard = %config.standard_file_name,
        hd = %config.hd_file_name,
        "encoded export artifacts"
    );

    Ok([
        ExportArtifact {
            label: DownloadLabel::Standard,
            file_name: config.standard_file_name.clone(),
            mime: PNG_MIME,
            bytes: Arc::clone(&bytes),
        },
        ExportArtifact {
            label: DownloadLabel::Hd,
            file_name: config.hd_file_name.clone(),
            mime: PNG_MIME,
            bytes,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProcessingMetadata, ResultImage};
    use image::{Rgba, RgbaImage};

    fn sample_result() -> ResultImage {
        let mut image = RgbaImage::from_pixel(8, 6, Rgba([0, 0, 0, 0]));
        for y in 2..4 {
            for x in 2..6 {
                image.put_pixel(x, y, Rgba([180, 40, 40, 255]));
            }
        }
        ResultImage::new(image, ProcessingMetadata::new("test".to_string()))
    }

    #[test]
    fn test_encode_png_roundtrips_alpha() {
        let result = sample_result();
        let bytes = encode_png(&result).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(3, 3)[3], 255);
    }

    #[test]
    fn test_encode_png_is_deterministic() {
        let result = sample_result();
        assert_eq!(encode_png(&result).unwrap(), encode_png(&result).unwrap());
    }

    #[test]
    fn test_export_downloads_share_identical_bytes() {
        let result = sample_result();
        let config = PipelineConfig::default();
        let [standard, hd] = export_downloads(&result, &config).unwrap();

        assert_eq!(standard.file_name, "nobg_image.png");
        assert_eq!(hd.file_name, "nobg_image_hd.png");
        assert_eq!(standard.mime, PNG_MIME);
        assert_eq!(hd.mime, PNG_MIME);
        // Same allocation, so byte-identical by construction
        assert!(Arc::ptr_eq(&standard.bytes, &hd.bytes));
        assert_eq!(*standard.bytes, *hd.bytes);
    }

    #[test]
    fn test_export_honors_configured_names() {
        let result = sample_result();
        let config = PipelineConfig::builder()
            .standard_file_name("cutout.png")
            .hd_file_name("cutout_hd.png")
            .build()
            .unwrap();
        let [standard, hd] = export_downloads(&result, &config).unwrap();
        assert_eq!(standard.file_name, "cutout.png");
        assert_eq!(hd.file_name, "cutout_hd.png");
    }

    #[test]
    fn test_caption_text() {
        assert_eq!(DownloadLabel::Standard.caption(), "Download Image");
        assert_eq!(DownloadLabel::Hd.caption(), "Download HD Image");
    }
}
