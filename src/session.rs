//! Per-request session: the intake -> transform -> export state machine
//!
//! One [`RemovalSession`] serves exactly one upload. State only moves forward;
//! a failed session stays failed and a completed one cannot be reused. Callers
//! wanting another attempt create a fresh session, which is cheap since all
//! heavyweight state (the collaborator) is shared by reference.

use crate::{
    config::PipelineConfig,
    error::{NobgError, Result},
    export::{export_downloads, ExportArtifact},
    intake::{decode_upload, SourceImage},
    progress::{ProcessingStage, ProgressReporter, ProgressTracker},
    transform::{transform_with_deadline, BackgroundRemover},
    types::ResultImage,
};
use instant::Instant;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Lifecycle of one removal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingUpload,
    Decoded,
    Transformed,
    Exported,
    Failed,
}

/// Everything a finished request hands back to its caller
#[derive(Debug)]
pub struct CompletedRequest {
    pub source: SourceImage,
    pub result: ResultImage,
    pub downloads: [ExportArtifact; 2],
}

impl CompletedRequest {
    /// Timing breakdown recorded while the request ran
    #[must_use]
    pub fn timings(&self) -> &crate::types::ProcessingTimings {
        &self.result.metadata.timings
    }
}

/// A single-use background removal request.
pub struct RemovalSession {
    request_id: Uuid,
    config: PipelineConfig,
    remover: Arc<dyn BackgroundRemover>,
    state: SessionState,
    inline_error: Option<String>,
    tracker: ProgressTracker,
}

impl RemovalSession {
    /// Create a session around a shared collaborator
    #[must_use]
    pub fn new(config: PipelineConfig, remover: Arc<dyn BackgroundRemover>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            config,
            remover,
            state: SessionState::Idle,
            inline_error: None,
            tracker: ProgressTracker::disabled(),
        }
    }

    /// Attach a progress reporter; replaces any previous one
    #[must_use]
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.tracker = ProgressTracker::new(reporter);
        self
    }

    /// Current state of the request
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Unique id of this request, for log correlation
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Inline error message from a failed run, phrased for end users
    #[must_use]
    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    /// Run the full pipeline on one upload.
    ///
    /// On failure the session lands in [`SessionState::Failed`] with
    /// [`Self::inline_error`] populated, and the error is also returned so
    /// programmatic callers can match on the variant.
    ///
    /// # Errors
    ///
    /// Every pipeline error plus `NobgError::State` when the session has
    /// already served a request.
    #[instrument(skip(self, bytes), fields(request_id = %self.request_id, byte_len = bytes.len()))]
    pub async fn process_upload(
        &mut self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<CompletedRequest> {
        if self.state != SessionState::Idle {
            return Err(NobgError::state(format!(
                "session already used (state {:?}); create a new session per request",
                self.state
            )));
        }
        let start = Instant::now();

        match self.run_pipeline(file_name, bytes, start).await {
            Ok(completed) => {
                self.state = SessionState::Exported;
                self.tracker.enter(ProcessingStage::Completed);
                info!(
                    total_ms = start.elapsed().as_millis() as u64,
                    "request complete"
                );
                Ok(completed)
            },
            Err(err) => {
                self.state = SessionState::Failed;
                self.inline_error = Some(err.user_message());
                warn!(error = %err, "request failed");
                Err(err)
            },
        }
    }

    async fn run_pipeline(
        &mut self,
        file_name: Option<&str>,
        bytes: &[u8],
        start: Instant,
    ) -> Result<CompletedRequest> {
        self.state = SessionState::AwaitingUpload;
        self.tracker.enter(ProcessingStage::Upload);

        self.tracker.enter(ProcessingStage::Decode);
        let decode_start = Instant::now();
        let source = decode_upload(bytes, file_name)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;
        self.state = SessionState::Decoded;

        self.tracker.enter(ProcessingStage::Transform);
        let mut result = transform_with_deadline(
            Arc::clone(&self.remover),
            &source,
            self.config.transform_deadline,
        )
        .await?;
        self.state = SessionState::Transformed;

        self.tracker.enter(ProcessingStage::Export);
        let encode_start = Instant::now();
        let downloads = export_downloads(&result, &self.config)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;

        result.metadata.timings.decode_ms = decode_ms;
        result.metadata.timings.encode_ms = Some(encode_ms);
        result.metadata.timings.total_ms = start.elapsed().as_millis() as u64;

        Ok(CompletedRequest {
            source,
            result,
            downloads,
        })
    }
}
