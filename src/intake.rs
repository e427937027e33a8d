//! Upload intake: accepted encodings, sniffing, decoding
//!
//! The intake stage turns an uploaded byte blob into a decoded raster or
//! rejects it. Rejections come in two flavors: `UnsupportedFormat` when the
//! encoding is outside the accepted set, `Decode` when bytes of an accepted
//! encoding are malformed.

use crate::error::{NobgError, Result};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// The closed set of encodings a request may upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedFormat {
    Jpeg,
    Png,
    WebP,
}

impl AcceptedFormat {
    /// All accepted file extensions, lowercase, without the dot
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "webp"];

    /// Map a file extension (without the dot, any case) to a format
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Map a sniffed `image::ImageFormat` to a format, if accepted
    #[must_use]
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    /// The `image` crate format used for decoding
    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }

    /// MIME type of the encoding
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for AcceptedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
        };
        write!(f, "{name}")
    }
}

/// A decoded upload, owned by exactly one request and discarded with it
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Decoded raster
    pub raster: DynamicImage,

    /// Encoding the upload arrived in
    pub format: AcceptedFormat,

    /// Size of the uploaded blob in bytes
    pub byte_len: usize,
}

impl SourceImage {
    /// Image dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }
}

/// Decode an uploaded blob into a [`SourceImage`].
///
/// When a file name is provided its extension is checked against the accepted
/// set before any bytes are inspected, matching the upload widget that rejects
/// unknown extensions up front. The actual encoding is then sniffed from the
/// bytes; the extension is advisory only.
///
/// # Errors
///
/// - `UnsupportedFormat` for an extension or sniffed encoding outside
///   {JPEG, PNG, WebP}
/// - `Decode` for empty uploads, unrecognizable bytes, or malformed data of an
///   accepted encoding
pub fn decode_upload(bytes: &[u8], file_name: Option<&str>) -> Result<SourceImage> {
    if let Some(name) = file_name {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if AcceptedFormat::from_extension(ext).is_none() {
            return Err(NobgError::unsupported_format(format!(
                "'{name}' is not an accepted upload; accepted extensions: .jpg .jpeg .png .webp"
            )));
        }
    }

    if bytes.is_empty() {
        return Err(NobgError::decode("upload is empty (0 bytes)"));
    }

    let sniffed = image::guess_format(bytes)
        .map_err(|e| NobgError::decode(format!("unrecognizable image bytes: {e}")))?;
    let format = AcceptedFormat::from_image_format(sniffed).ok_or_else(|| {
        NobgError::unsupported_format(format!(
            "{sniffed:?} content is not accepted; accepted encodings: JPEG, PNG, WebP"
        ))
    })?;

    let raster = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|e| NobgError::decode(format!("failed to decode {format} upload: {e}")))?;

    debug!(
        format = %format,
        width = raster.width(),
        height = raster.height(),
        byte_len = bytes.len(),
        "decoded upload"
    );

    Ok(SourceImage {
        raster,
        format,
        byte_len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(AcceptedFormat::from_extension("jpg"), Some(AcceptedFormat::Jpeg));
        assert_eq!(AcceptedFormat::from_extension("JPEG"), Some(AcceptedFormat::Jpeg));
        assert_eq!(AcceptedFormat::from_extension("png"), Some(AcceptedFormat::Png));
        assert_eq!(AcceptedFormat::from_extension("webp"), Some(AcceptedFormat::WebP));
        assert_eq!(AcceptedFormat::from_extension("gif"), None);
        assert_eq!(AcceptedFormat::from_extension(""), None);
    }

    #[test]
    fn test_decode_png_preserves_dimensions() {
        let image = RgbImage::from_pixel(17, 9, Rgb([200, 10, 10]));
        let bytes = encode(&image, ImageFormat::Png);

        let source = decode_upload(&bytes, Some("photo.png")).unwrap();
        assert_eq!(source.dimensions(), (17, 9));
        assert_eq!(source.format, AcceptedFormat::Png);
        assert_eq!(source.byte_len, bytes.len());
    }

    #[test]
    fn test_decode_jpeg_preserves_dimensions() {
        let image = RgbImage::from_pixel(32, 24, Rgb([0, 128, 255]));
        let bytes = encode(&image, ImageFormat::Jpeg);

        let source = decode_upload(&bytes, None).unwrap();
        assert_eq!(source.dimensions(), (32, 24));
        assert_eq!(source.format, AcceptedFormat::Jpeg);
    }

    #[test]
    fn test_rejected_extension_before_decode() {
        // Valid PNG bytes behind a rejected extension never reach the decoder
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let bytes = encode(&image, ImageFormat::Png);

        let err = decode_upload(&bytes, Some("animation.gif")).unwrap_err();
        assert!(matches!(err, NobgError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_empty_upload_is_decode_error() {
        let err = decode_upload(&[], Some("photo.png")).unwrap_err();
        assert!(matches!(err, NobgError::Decode(_)));
        assert!(err.to_string().contains("0 bytes"));
    }

    #[test]
    fn test_non_image_bytes_are_decode_error() {
        let err = decode_upload(b"definitely not an image", None).unwrap_err();
        assert!(matches!(err, NobgError::Decode(_)));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let image = RgbImage::from_pixel(64, 64, Rgb([9, 9, 9]));
        let mut bytes = encode(&image, ImageFormat::Png);
        bytes.truncate(bytes.len() / 3);

        let err = decode_upload(&bytes, Some("broken.png")).unwrap_err();
        assert!(matches!(err, NobgError::Decode(_)));
    }

    #[test]
    fn test_unaccepted_content_behind_accepted_extension() {
        // BMP magic bytes behind a .png name: sniffing wins
        let mut bytes = b"BM".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);

        let err = decode_upload(&bytes, Some("disguised.png")).unwrap_err();
        assert!(matches!(err, NobgError::UnsupportedFormat(_)));
    }
}
