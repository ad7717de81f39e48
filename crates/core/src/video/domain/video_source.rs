use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sequential frame source for the capture loop.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types. A source is moved onto the capture thread, hence `Send`.
pub trait VideoSource: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    fn is_opened(&self) -> bool;

    /// Decodes the next frame. `Ok(None)` means the source is exhausted.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Frames per second as reported by the container, 0.0 if unknown.
    fn native_frame_rate(&self) -> f64;

    /// Releases decoder resources. Safe to call more than once.
    fn release(&mut self);
}
