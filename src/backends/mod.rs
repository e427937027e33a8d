//! Background removal collaborators
//!
//! Two implementations of [`crate::BackgroundRemover`]:
//! - ONNX Runtime backend running a downloaded segmentation model (the
//!   production collaborator, feature `onnx`)
//! - corner-sampling mock backend for tests and model-free operation

pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use self::mock::CornerSampleRemover;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxRemover;
