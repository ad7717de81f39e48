use std::time::Duration;

use crate::shared::frame::Frame;

/// Final stage of the pipeline: presents annotated frames.
///
/// Only the display thread ever touches a sink, so implementations need not
/// be `Sync`. They are created on the main thread and used there.
pub trait DisplaySink {
    /// Presents one annotated frame.
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Waits up to `delay` for a user quit request.
    ///
    /// Returns `true` once the user asked to stop. Sinks without user
    /// interaction return `false` immediately.
    fn poll_user_stop(&mut self, delay: Duration) -> bool;

    /// Releases every window or file handle the sink holds.
    /// Must be safe to call more than once.
    fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
