use std::time::Duration;

use opencv::core::{Vec3b, VecN};
use opencv::highgui;
use opencv::prelude::*;

use crate::display::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;

const KEY_ESCAPE: i32 = 27;
const KEY_QUIT: i32 = 'q' as i32;

/// Shows annotated frames in an OpenCV HighGUI window.
///
/// `q` or Esc in the window requests a stop. The window is created lazily
/// on the first frame so a run that fails before producing output never
/// flashes an empty window.
pub struct HighguiWindowSink {
    title: String,
    window_open: bool,
}

impl HighguiWindowSink {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            window_open: false,
        }
    }
}

/// Repacks RGB bytes into OpenCV's BGR pixel order.
fn to_bgr_pixels(rgb: &[u8]) -> Vec<Vec3b> {
    rgb.chunks_exact(Frame::CHANNELS)
        .map(|px| VecN([px[2], px[1], px[0]]))
        .collect()
}

impl DisplaySink for HighguiWindowSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !self.window_open {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.window_open = true;
        }

        let pixels = to_bgr_pixels(frame.data());
        let mat = Mat::new_rows_cols_with_data(frame.height() as i32, frame.width() as i32, &pixels)?;
        highgui::imshow(&self.title, &*mat)?;
        Ok(())
    }

    fn poll_user_stop(&mut self, delay: Duration) -> bool {
        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX).max(1);
        match highgui::wait_key(ms) {
            Ok(key) => {
                let key = key & 0xFF;
                key == KEY_QUIT || key == KEY_ESCAPE
            }
            Err(e) => {
                log::warn!("Polling window keys failed: {e}");
                false
            }
        }
    }

    fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.window_open {
            highgui::destroy_all_windows()?;
            self.window_open = false;
        }
        Ok(())
    }
}
