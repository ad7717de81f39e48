use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// Decoder state lives between `open` and `release` so `read` can pull one
/// frame at a time without buffering the stream.
pub struct FfmpegVideoSource {
    state: Option<DecodeState>,
    fps: f64,
}

// Safety: FfmpegVideoSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoSource {}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegVideoSource {
    pub fn new() -> Self {
        Self {
            state: None,
            fps: 0.0,
        }
    }
}

impl Default for FfmpegVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for FfmpegVideoSource {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let total_frames = stream.frames().max(0) as usize;

        let width = decoder.width();
        let height = decoder.height();
        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} ({width}x{height} @ {fps:.2} fps, {total_frames} frames)",
            path.display()
        );

        self.fps = fps;
        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        });

        Ok(metadata)
    }

    fn is_opened(&self) -> bool {
        self.state.is_some()
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let state = self
            .state
            .as_mut()
            .ok_or("FfmpegVideoSource: not opened")?;
        state.next_frame()
    }

    fn native_frame_rate(&self) -> f64 {
        self.fps
    }

    fn release(&mut self) {
        self.state = None;
    }
}

impl DecodeState {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let next = self
                .ictx
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            let Some((stream_index, packet)) = next else {
                // End of container: drain frames still buffered in the decoder.
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive()? {
                    return Ok(Some(frame));
                }
                self.done = true;
                return Ok(None);
            };

            if stream_index != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::domain::display_sink::DisplaySink;
    use crate::display::infrastructure::ffmpeg_recording_sink::FfmpegRecordingSink;
    use std::path::PathBuf;

    fn write_test_video(dir: &Path, num_frames: usize, width: u32, height: u32) -> PathBuf {
        let path = dir.join("source.mp4");
        let meta = VideoMetadata {
            width,
            height,
            fps: 25.0,
            total_frames: num_frames,
            codec: String::new(),
            source_path: None,
        };
        let mut sink = FfmpegRecordingSink::create(&path, &meta).unwrap();
        for i in 0..num_frames {
            let value = ((i * 40) % 256) as u8;
            let frame = Frame::new(vec![value; (width * height * 3) as usize], width, height, i);
            sink.show(&frame).unwrap();
        }
        sink.close_all().unwrap();
        path
    }

    #[test]
    fn test_open_reports_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 4, 160, 120);

        let mut source = FfmpegVideoSource::new();
        assert!(!source.is_opened());
        let meta = source.open(&path).unwrap();

        assert!(source.is_opened());
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.fps > 0.0);
        assert!((source.native_frame_rate() - meta.fps).abs() < f64::EPSILON);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut source = FfmpegVideoSource::new();
        assert!(source.open(Path::new("/nonexistent/clip.mp4")).is_err());
        assert!(!source.is_opened());
    }

    #[test]
    fn test_read_yields_every_frame_then_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 5, 160, 120);

        let mut source = FfmpegVideoSource::new();
        source.open(&path).unwrap();

        let mut indices = Vec::new();
        while let Some(frame) = source.read().unwrap() {
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            indices.push(frame.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_read_without_open_is_error() {
        let mut source = FfmpegVideoSource::new();
        assert!(source.read().is_err());
    }

    #[test]
    fn test_release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 1, 160, 120);

        let mut source = FfmpegVideoSource::new();
        source.open(&path).unwrap();
        source.release();
        source.release();
        assert!(!source.is_opened());
    }
}
