//! ONNX Runtime collaborator
//!
//! Runs an ISNet-style segmentation model through ONNX Runtime. The model is
//! the actual owner of the background/foreground classification; this module
//! only shuttles pixels in and out: aspect-preserving resize onto a square
//! canvas, NCHW normalization, inference, and back-projection of the predicted
//! mask onto the original raster as an alpha channel.

use crate::error::{NobgError, Result};
use crate::transform::BackgroundRemover;
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Model input edge length (ISNet family)
const TARGET_SIZE: u32 = 1024;

/// ImageNet normalization constants used by the ISNet family
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Mapping between original raster coordinates and mask tensor coordinates
#[derive(Debug, Clone, Copy)]
struct MaskProjection {
    scale: f32,
    offset_x: u32,
    offset_y: u32,
    mask_width: u32,
    mask_height: u32,
}

/// Background remover backed by an ONNX Runtime session.
///
/// The session is created once and shared; ONNX Runtime requires exclusive
/// access per run, so calls are serialized through a mutex.
pub struct OnnxRemover {
    session: Mutex<Session>,
    model_name: String,
}

impl OnnxRemover {
    /// Load a segmentation model from an `.onnx` file.
    ///
    /// # Errors
    ///
    /// `NobgError::Model` when the session cannot be built from the file.
    pub fn from_model_file<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model_name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx-model")
            .to_string();

        let threads = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(4);

        let session = Session::builder()
            .map_err(|e| NobgError::model(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| NobgError::model(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(threads)
            .map_err(|e| NobgError::model(format!("failed to set intra threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                NobgError::model(format!(
                    "failed to load model '{}': {e}",
                    model_path.display()
                ))
            })?;

        info!(model = %model_name, threads, "ONNX session created");

        Ok(Self {
            session: Mutex::new(session),
            model_name,
        })
    }

    fn infer(&self, input: Array4<f32>) -> Result<Array4<f32>> {
        let input_value = Value::from_array(input)
            .map_err(|e| NobgError::transform(format!("failed to convert input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| NobgError::transform("ONNX session mutex poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| NobgError::transform(format!("ONNX inference failed: {e}")))?;

        // Positional output access: segmentation models emit the mask first
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| NobgError::transform("model produced no output tensors"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| NobgError::transform("first output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| NobgError::transform(format!("failed to extract output tensor: {e}")))?;

        let shape = output_tensor.shape();
        if shape.len() != 4 {
            return Err(NobgError::transform(format!(
                "expected 4D output tensor, got {}D",
                shape.len()
            )));
        }
        let dims = (
            shape.first().copied().unwrap_or(1),
            shape.get(1).copied().unwrap_or(1),
            shape.get(2).copied().unwrap_or(1),
            shape.get(3).copied().unwrap_or(1),
        );
        let data = output_tensor.view().to_owned();
        Array4::from_shape_vec(dims, data.into_raw_vec_and_offset().0)
            .map_err(|e| NobgError::transform(format!("failed to reshape output tensor: {e}")))
    }
}

impl BackgroundRemover for OnnxRemover {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let tensor = preprocess(image);
        debug!(dims = ?tensor.dim(), "running segmentation inference");
        let output = self.infer(tensor)?;

        let original_dimensions = (image.width(), image.height());
        let mask = project_mask(&output, original_dimensions)?;
        Ok(apply_mask(image, &mask, original_dimensions))
    }
}

/// Resize onto a white-padded square canvas and normalize into an NCHW tensor
fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (orig_width, orig_height) = rgb.dimensions();

    let target = TARGET_SIZE as f32;
    let scale = (target / orig_width as f32).min(target / orig_height as f32).min(target);
    let new_width = ((orig_width as f32) * scale).round() as u32;
    let new_height = ((orig_height as f32) * scale).round() as u32;

    let resized = image::imageops::resize(
        &rgb,
        new_width.max(1),
        new_height.max(1),
        image::imageops::FilterType::Triangle,
    );

    let mut canvas =
        ImageBuffer::from_pixel(TARGET_SIZE, TARGET_SIZE, image::Rgb([255u8, 255, 255]));
    let offset_x = (TARGET_SIZE - new_width.min(TARGET_SIZE)) / 2;
    let offset_y = (TARGET_SIZE - new_height.min(TARGET_SIZE)) / 2;
    for (x, y, pixel) in resized.enumerate_pixels() {
        let canvas_x = x + offset_x;
        let canvas_y = y + offset_y;
        if canvas_x < TARGET_SIZE && canvas_y < TARGET_SIZE {
            canvas.put_pixel(canvas_x, canvas_y, *pixel);
        }
    }

    let mut tensor = Array4::<f32>::zeros((1, 3, TARGET_SIZE as usize, TARGET_SIZE as usize));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for channel in 0..3 {
            let value = f32::from(pixel[channel]) / 255.0;
            tensor[[0, channel, y as usize, x as usize]] =
                (value - NORM_MEAN[channel]) / NORM_STD[channel];
        }
    }
    tensor
}

/// Project the square mask tensor back onto the original raster's grid
fn project_mask(tensor: &Array4<f32>, original_dimensions: (u32, u32)) -> Result<Vec<u8>> {
    let shape = tensor.shape();
    if shape.first().copied().unwrap_or(0) != 1 || shape.get(1).copied().unwrap_or(0) != 1 {
        return Err(NobgError::transform(format!(
            "unexpected mask tensor shape {shape:?}"
        )));
    }
    let mask_height = shape.get(2).copied().unwrap_or(0) as u32;
    let mask_width = shape.get(3).copied().unwrap_or(0) as u32;
    let (orig_width, orig_height) = original_dimensions;

    // Reproduce the preprocessing math to invert it
    let target = mask_width as f32;
    let scale = (target / orig_width as f32).min(target / orig_height as f32).min(target);
    let scaled_width = ((orig_width as f32) * scale).round() as u32;
    let scaled_height = ((orig_height as f32) * scale).round() as u32;
    let projection = MaskProjection {
        scale,
        offset_x: (mask_width - scaled_width.min(mask_width)) / 2,
        offset_y: (mask_height - scaled_height.min(mask_height)) / 2,
        mask_width,
        mask_height,
    };

    let mut mask = Vec::with_capacity((orig_width * orig_height) as usize);
    for y in 0..orig_height {
        for x in 0..orig_width {
            let value = sample_mask(tensor, x, y, projection);
            mask.push((value.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }
    Ok(mask)
}

fn sample_mask(tensor: &Array4<f32>, x: u32, y: u32, projection: MaskProjection) -> f32 {
    let tensor_x = ((x as f32) * projection.scale).round() as u32 + projection.offset_x;
    let tensor_y = ((y as f32) * projection.scale).round() as u32 + projection.offset_y;
    if tensor_x < projection.mask_width && tensor_y < projection.mask_height {
        tensor
            .get([0, 0, tensor_y as usize, tensor_x as usize])
            .copied()
            .unwrap_or(0.0)
    } else {
        // Outside the model's prediction area
        0.0
    }
}

/// Write the mask into the alpha channel of the original raster
fn apply_mask(image: &DynamicImage, mask: &[u8], dimensions: (u32, u32)) -> RgbaImage {
    let rgba = image.to_rgba8();
    let (width, height) = dimensions;
    let mut result = ImageBuffer::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let index = (y * width + x) as usize;
        let alpha = mask.get(index).copied().unwrap_or(0);
        if alpha > 0 {
            result.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], alpha]));
        } else {
            result.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
    result
}
