use std::time::Duration;

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::display::domain::display_sink::DisplaySink;
use crate::imaging::annotator::AnnotationStyle;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{
    DEFAULT_DISPLAY_POLL_MS, DEFAULT_QUEUE_CAPACITY, DEFAULT_REORDER_WINDOW, DEFAULT_WORKER_COUNT,
};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

/// What the capture loop does when the work queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backpressure {
    /// Wait for a free slot.
    #[default]
    Block,
    /// Sleep `pause` and retry the same frame.
    Poll { pause: Duration },
}

/// Configuration for a pipeline execution run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub backpressure: Backpressure,
    /// Re-sequence worker output so frames are shown in capture order.
    pub ordered_display: bool,
    /// Frames held behind a missing sequence number before ordered display
    /// gives up on it.
    pub reorder_window: usize,
    /// How long the display stage waits for a quit key after each frame.
    pub display_poll: Duration,
    pub style: AnnotationStyle,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig("workers must be >= 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "queue capacity must be >= 1".into(),
            ));
        }
        if self.reorder_window == 0 {
            return Err(PipelineError::InvalidConfig(
                "reorder window must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backpressure: Backpressure::Block,
            ordered_display: false,
            reorder_window: DEFAULT_REORDER_WINDOW,
            display_poll: Duration::from_millis(DEFAULT_DISPLAY_POLL_MS),
            style: AnnotationStyle::default(),
        }
    }
}

/// How the capture loop finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureEnd {
    /// The source ran out of frames.
    #[default]
    Exhausted,
    /// The source returned an error; treated like exhaustion.
    ReadFailed,
    /// A stop was requested before the source ran out.
    Stopped,
}

/// Totals for a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames_captured: usize,
    pub frames_processed: usize,
    pub frames_shown: usize,
    pub detection_failures: usize,
    pub capture_end: CaptureEnd,
    pub user_stopped: bool,
}

/// Abstracts how the capture -> detect -> display pipeline is executed.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations. One [`FaceAnalyzer`] is passed per worker; the
/// sink stays on the calling thread.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        source: Box<dyn VideoSource>,
        analyzers: Vec<FaceAnalyzer>,
        sink: &mut dyn DisplaySink,
        metadata: &VideoMetadata,
        config: &PipelineConfig,
        logger: &mut dyn PipelineLogger,
    ) -> Result<PipelineReport, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 30);
        assert_eq!(config.backpressure, Backpressure::Block);
        assert!(!config.ordered_display);
        assert_eq!(config.reorder_window, 120);
        assert_eq!(config.display_poll, Duration::from_millis(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_invalid() {
        let config = PipelineConfig {
            workers: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let config = PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_reorder_window_invalid() {
        let config = PipelineConfig {
            reorder_window: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
