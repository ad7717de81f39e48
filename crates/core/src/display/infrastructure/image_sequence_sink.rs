use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::display::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;

/// Writes every shown frame as a numbered PNG inside a directory.
///
/// Files are named by display order (`frame_000000.png`, ...), which with
/// unordered display may differ from source order.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: usize,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    fn path_for(&self, n: usize) -> PathBuf {
        self.dir.join(format!("frame_{n:06}.png"))
    }
}

impl DisplaySink for ImageSequenceSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let img = frame
            .as_rgb_image()
            .ok_or("Failed to create image from frame data")?;
        img.save(self.path_for(self.written))?;
        self.written += 1;
        Ok(())
    }

    fn poll_user_stop(&mut self, _delay: Duration) -> bool {
        false
    }

    fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 0)
    }

    #[test]
    fn test_show_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let mut sink = ImageSequenceSink::create(&out).unwrap();

        sink.show(&make_frame(20, 10, [1, 2, 3])).unwrap();
        sink.show(&make_frame(20, 10, [4, 5, 6])).unwrap();
        sink.close_all().unwrap();

        assert_eq!(sink.frames_written(), 2);
        assert!(out.join("frame_000000.png").exists());
        assert!(out.join("frame_000001.png").exists());
    }

    #[test]
    fn test_written_pixels_survive() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::create(dir.path()).unwrap();
        sink.show(&make_frame(8, 8, [50, 100, 200])).unwrap();

        let img = image::open(dir.path().join("frame_000000.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(3, 3).0, [50, 100, 200]);
    }

    #[test]
    fn test_never_requests_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::create(dir.path()).unwrap();
        assert!(!sink.poll_user_stop(Duration::from_millis(5)));
    }
}
