use std::path::PathBuf;
use std::time::Duration;

use crate::shared::constants::FALLBACK_FRAME_INTERVAL_MS;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Playback time of one frame at the native rate.
    ///
    /// Containers sometimes report 0 or garbage; those fall back to ~30 fps.
    pub fn frame_interval(&self) -> Duration {
        frame_interval_for(self.fps)
    }
}

pub fn frame_interval_for(fps: f64) -> Duration {
    if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::from_millis(FALLBACK_FRAME_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn metadata(fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            fps,
            total_frames: 100,
            codec: "mpeg4".to_string(),
            source_path: Some(PathBuf::from("/tmp/clip.mp4")),
        }
    }

    #[test]
    fn test_frame_interval_at_25_fps() {
        assert_relative_eq!(metadata(25.0).frame_interval().as_secs_f64(), 0.04);
    }

    #[test]
    fn test_frame_interval_at_ntsc_rate() {
        let interval = metadata(30000.0 / 1001.0).frame_interval();
        assert_relative_eq!(interval.as_secs_f64(), 1001.0 / 30000.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_frame_interval_fallback(#[case] fps: f64) {
        assert_eq!(
            metadata(fps).frame_interval(),
            Duration::from_millis(FALLBACK_FRAME_INTERVAL_MS)
        );
    }
}
