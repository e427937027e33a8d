//! End-to-end pipeline workflows
//!
//! Exercises the upload-to-download path with in-memory fixtures: no model
//! files, no committed binaries.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use nobg::{
    backends::CornerSampleRemover, remove_background_from_bytes, PipelineConfig, RemovalSession,
    SessionState, PNG_MIME,
};
use std::io::Cursor;
use std::sync::Arc;

/// Flat light field with a dark centered square, encoded in `format`
fn square_fixture(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut image = RgbImage::from_pixel(width, height, Rgb([248, 248, 248]));
    let (cx, cy) = (width / 2, height / 2);
    let half = width.min(height) / 4;
    for y in cy.saturating_sub(half)..(cy + half).min(height) {
        for x in cx.saturating_sub(half)..(cx + half).min(width) {
            image.put_pixel(x, y, Rgb([25, 70, 140]));
        }
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

fn remover() -> Arc<CornerSampleRemover> {
    Arc::new(CornerSampleRemover::default())
}

#[tokio::test]
async fn png_upload_produces_two_identical_png_downloads() {
    let bytes = square_fixture(40, 30, ImageFormat::Png);
    let completed = remove_background_from_bytes(
        &bytes,
        Some("photo.png"),
        remover(),
        PipelineConfig::default(),
    )
    .await
    .unwrap();

    let [standard, hd] = &completed.downloads;
    assert_eq!(standard.file_name, "nobg_image.png");
    assert_eq!(hd.file_name, "nobg_image_hd.png");
    assert_eq!(standard.mime, PNG_MIME);
    assert_eq!(hd.mime, PNG_MIME);
    assert_eq!(*standard.bytes, *hd.bytes);

    // Both artifacts decode as PNG with the source dimensions
    let decoded = image::load_from_memory_with_format(&standard.bytes, ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 30));
}

#[tokio::test]
async fn jpeg_solid_square_keeps_subject_and_clears_field() {
    let bytes = square_fixture(48, 48, ImageFormat::Jpeg);
    let completed = remove_background_from_bytes(
        &bytes,
        Some("photo.jpg"),
        remover(),
        PipelineConfig::default(),
    )
    .await
    .unwrap();

    let decoded = image::load_from_memory(&completed.downloads[0].bytes)
        .unwrap()
        .to_rgba8();
    // Center of the square stays opaque, corners become transparent
    assert_eq!(decoded.get_pixel(24, 24)[3], 255);
    assert_eq!(decoded.get_pixel(1, 1)[3], 0);
    assert_eq!(decoded.get_pixel(46, 46)[3], 0);
}

#[cfg(feature = "webp-support")]
#[tokio::test]
async fn webp_upload_is_accepted() {
    let bytes = square_fixture(20, 20, ImageFormat::WebP);
    let completed = remove_background_from_bytes(
        &bytes,
        Some("photo.webp"),
        remover(),
        PipelineConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(completed.result.dimensions(), (20, 20));
    assert_eq!(completed.source.format.to_string(), "WebP");
}

#[tokio::test]
async fn dimensions_survive_the_full_pipeline() {
    for (width, height) in [(1, 1), (7, 31), (100, 60)] {
        let bytes = square_fixture(width, height, ImageFormat::Png);
        let completed =
            remove_background_from_bytes(&bytes, None, remover(), PipelineConfig::default())
                .await
                .unwrap();
        assert_eq!(completed.result.dimensions(), (width, height));
    }
}

#[tokio::test]
async fn export_is_idempotent_for_the_same_result() {
    let bytes = square_fixture(32, 32, ImageFormat::Png);
    let completed = remove_background_from_bytes(
        &bytes,
        Some("photo.png"),
        remover(),
        PipelineConfig::default(),
    )
    .await
    .unwrap();

    let re_encoded = nobg::encode_png(&completed.result).unwrap();
    assert_eq!(re_encoded, *completed.downloads[0].bytes);
}

#[tokio::test]
async fn session_walks_the_state_machine() {
    let mut session = RemovalSession::new(PipelineConfig::default(), remover());
    assert_eq!(session.state(), SessionState::Idle);

    let bytes = square_fixture(16, 16, ImageFormat::Png);
    session
        .process_upload(Some("photo.png"), &bytes)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Exported);
    assert!(session.inline_error().is_none());
}

#[tokio::test]
async fn concurrent_sessions_share_one_collaborator() {
    let shared = remover();
    let mut handles = Vec::new();
    for i in 0..8u32 {
        let shared = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            let bytes = square_fixture(20 + i, 20, ImageFormat::Png);
            remove_background_from_bytes(&bytes, None, shared, PipelineConfig::default()).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let completed = handle.await.unwrap().unwrap();
        assert_eq!(completed.result.dimensions(), (20 + i as u32, 20));
    }
}

#[tokio::test]
async fn timings_are_populated() {
    let bytes = square_fixture(32, 32, ImageFormat::Png);
    let completed =
        remove_background_from_bytes(&bytes, None, remover(), PipelineConfig::default())
            .await
            .unwrap();
    let timings = &completed.result.metadata.timings;
    assert!(timings.encode_ms.is_some());
    assert!(timings.total_ms >= timings.decode_ms + timings.transform_ms);
}
