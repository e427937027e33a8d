//! Error types for the background removal pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, NobgError>;

/// Errors produced by the intake → transform → export pipeline
#[derive(Error, Debug)]
pub enum NobgError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload bytes are not a valid image of an accepted encoding
    #[error("decode error: {0}")]
    Decode(String),

    /// Encoding is outside the accepted set (JPEG, PNG, WebP)
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The background removal collaborator failed
    #[error("background removal failed: {0}")]
    Transform(String),

    /// The background removal collaborator did not finish within its deadline
    #[error("background removal timed out after {elapsed_ms}ms (deadline {deadline_ms}ms)")]
    TransformTimeout {
        /// Time spent before giving up
        elapsed_ms: u64,
        /// Configured deadline
        deadline_ms: u64,
    },

    /// PNG export failed
    #[error("encode error: {0}")]
    Encode(String),

    /// Model acquisition or loading errors
    #[error("model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session used outside its allowed state transitions
    #[error("invalid session state: {0}")]
    State(String),
}

impl NobgError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a new transform error
    pub fn transform<S: Into<String>>(msg: S) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new session state error
    pub fn state<S: Into<String>>(msg: S) -> Self {
        Self::State(msg.into())
    }

    /// Render the inline message shown to the user when a request fails.
    ///
    /// Mirrors the single error surface of the tool: every failure is caught
    /// at the top of the request handler and shown as one line of text.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("An error occurred: {self}")
    }

    /// Whether this error is one of the user-facing intake rejections
    /// (as opposed to an internal pipeline failure).
    #[must_use]
    pub fn is_intake_rejection(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::UnsupportedFormat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NobgError::decode("truncated stream");
        assert!(matches!(err, NobgError::Decode(_)));

        let err = NobgError::unsupported_format("tiff");
        assert!(matches!(err, NobgError::UnsupportedFormat(_)));

        let err = NobgError::transform("session dropped");
        assert!(matches!(err, NobgError::Transform(_)));
    }

    #[test]
    fn test_error_display() {
        let err = NobgError::decode("upload is empty (0 bytes)");
        assert_eq!(err.to_string(), "decode error: upload is empty (0 bytes)");

        let err = NobgError::TransformTimeout {
            elapsed_ms: 60_012,
            deadline_ms: 60_000,
        };
        let text = err.to_string();
        assert!(text.contains("60012ms"));
        assert!(text.contains("deadline 60000ms"));
    }

    #[test]
    fn test_user_message_prefix() {
        let err = NobgError::transform("model produced no output");
        assert_eq!(
            err.user_message(),
            "An error occurred: background removal failed: model produced no output"
        );
    }

    #[test]
    fn test_intake_rejection_classification() {
        assert!(NobgError::decode("bad bytes").is_intake_rejection());
        assert!(NobgError::unsupported_format("gif").is_intake_rejection());
        assert!(!NobgError::transform("boom").is_intake_rejection());
        assert!(!NobgError::encode("boom").is_intake_rejection());
    }

    #[test]
    fn test_timeout_is_distinct_from_transform() {
        let timeout = NobgError::TransformTimeout {
            elapsed_ms: 1000,
            deadline_ms: 1000,
        };
        assert!(!matches!(timeout, NobgError::Transform(_)));
    }
}
