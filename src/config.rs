//! Pipeline configuration

use crate::error::{NobgError, Result};
use std::time::Duration;

/// Default deadline for the delegated background removal call
pub const DEFAULT_TRANSFORM_DEADLINE: Duration = Duration::from_secs(60);

/// File name offered for the standard download
pub const STANDARD_FILE_NAME: &str = "nobg_image.png";

/// File name offered for the HD download
pub const HD_FILE_NAME: &str = "nobg_image_hd.png";

/// Configuration for one removal pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Deadline applied to the transform stage; `None` disables the deadline
    /// and lets a hung collaborator hang the request.
    pub transform_deadline: Option<Duration>,

    /// File name of the standard download artifact
    pub standard_file_name: String,

    /// File name of the HD download artifact
    pub hd_file_name: String,

    /// Enable debug logging of intermediate stages
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transform_deadline: Some(DEFAULT_TRANSFORM_DEADLINE),
            standard_file_name: STANDARD_FILE_NAME.to_string(),
            hd_file_name: HD_FILE_NAME.to_string(),
            debug: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for `PipelineConfig`
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the transform deadline; `None` disables it
    #[must_use]
    pub fn transform_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.transform_deadline = deadline;
        self
    }

    #[must_use]
    pub fn standard_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.standard_file_name = name.into();
        self
    }

    #[must_use]
    pub fn hd_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.hd_file_name = name.into();
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `NobgError::InvalidConfig` for:
    /// - a zero-length deadline
    /// - artifact names that are empty or do not end in `.png` (export is
    ///   PNG-only)
    pub fn build(self) -> Result<PipelineConfig> {
        if let Some(deadline) = self.config.transform_deadline {
            if deadline.is_zero() {
                return Err(NobgError::invalid_config(
                    "transform deadline must be greater than zero (or disabled)",
                ));
            }
        }
        for name in [&self.config.standard_file_name, &self.config.hd_file_name] {
            if name.is_empty() {
                return Err(NobgError::invalid_config("artifact file name is empty"));
            }
            if !name.to_ascii_lowercase().ends_with(".png") {
                return Err(NobgError::invalid_config(format!(
                    "artifact file name '{name}' must end in .png"
                )));
            }
        }
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.transform_deadline, Some(DEFAULT_TRANSFORM_DEADLINE));
        assert_eq!(config.standard_file_name, "nobg_image.png");
        assert_eq!(config.hd_file_name, "nobg_image_hd.png");
        assert!(!config.debug);
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::builder()
            .transform_deadline(Some(Duration::from_secs(5)))
            .debug(true)
            .build()
            .unwrap();
        assert_eq!(config.transform_deadline, Some(Duration::from_secs(5)));
        assert!(config.debug);
    }

    #[test]
    fn test_deadline_can_be_disabled() {
        let config = PipelineConfig::builder()
            .transform_deadline(None)
            .build()
            .unwrap();
        assert!(config.transform_deadline.is_none());
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let err = PipelineConfig::builder()
            .transform_deadline(Some(Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(matches!(err, NobgError::InvalidConfig(_)));
    }

    #[test]
    fn test_non_png_artifact_name_rejected() {
        let err = PipelineConfig::builder()
            .hd_file_name("result.webp")
            .build()
            .unwrap_err();
        assert!(matches!(err, NobgError::InvalidConfig(_)));
    }
}
