//! Progress reporting for the processing pipeline
//!
//! Drives the "Removing background..." busy indicator. Reporting is advisory:
//! a reporter failure or absence never affects the pipeline outcome.

use instant::Instant;
use std::sync::Arc;
use tracing::info;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Upload,
    Decode,
    Transform,
    Export,
    Completed,
}

impl ProcessingStage {
    /// Human-readable description shown next to the busy indicator
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Upload => "Receiving upload",
            Self::Decode => "Decoding image",
            Self::Transform => "Removing background...",
            Self::Export => "Encoding PNG",
            Self::Completed => "Done",
        }
    }

    /// Approximate progress through the pipeline, 0 to 100
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Upload => 5,
            Self::Decode => 15,
            Self::Transform => 30,
            Self::Export => 90,
            Self::Completed => 100,
        }
    }
}

/// One progress notification
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    pub percentage: u8,
    pub elapsed_ms: u64,
}

/// Sink for progress updates
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: &ProgressUpdate);
}

/// Reporter that discards every update
#[derive(Debug, Default, Clone)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Reporter that logs each stage through tracing
#[derive(Debug, Default, Clone)]
pub struct ConsoleProgressReporter;

impl ProgressReporter for ConsoleProgressReporter {
    fn report(&self, update: &ProgressUpdate) {
        info!(
            stage = update.stage.description(),
            percentage = update.percentage,
            elapsed_ms = update.elapsed_ms,
            "progress"
        );
    }
}

/// Tracks the current stage of one request and fans updates out to a reporter
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    started: Instant,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            started: Instant::now(),
        }
    }

    /// Tracker that reports nowhere
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    /// Record entry into `stage`
    pub fn enter(&self, stage: ProcessingStage) {
        self.reporter.report(&ProgressUpdate {
            stage,
            percentage: stage.progress_percentage(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        });
    }

    /// Milliseconds since the tracker was created
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
