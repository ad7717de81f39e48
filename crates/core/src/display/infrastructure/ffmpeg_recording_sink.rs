use std::path::Path;
use std::time::Duration;

use crate::display::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Records annotated frames to a video file instead of a window.
///
/// Uses MPEG4 in whatever container the output extension selects. Frame
/// timestamps follow the source rate so the recording plays back at the
/// original speed.
pub struct FfmpegRecordingSink {
    encoding: Option<EncodeState>,
    width: u32,
    height: u32,
    frames_written: usize,
}

// Safety: FfmpegRecordingSink is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegRecordingSink {}

struct EncodeState {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    time_base: ffmpeg_next::Rational,
}

impl FfmpegRecordingSink {
    pub fn create(
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = recording_rate(metadata.fps);
        let time_base = ffmpeg_next::Rational(1, fps);
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Recording annotated video to {} at {fps} fps",
            path.display()
        );

        Ok(Self {
            encoding: Some(EncodeState {
                octx,
                encoder,
                scaler,
                time_base,
            }),
            width: metadata.width,
            height: metadata.height,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

/// Integer encoder rate; sources without a usable rate record at 30 fps.
fn recording_rate(fps: f64) -> i32 {
    let rounded = fps.round();
    if rounded.is_finite() && rounded >= 1.0 {
        rounded as i32
    } else {
        30
    }
}

impl EncodeState {
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(0)
            .ok_or("output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

impl DisplaySink for FfmpegRecordingSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let state = self
            .encoding
            .as_mut()
            .ok_or("FfmpegRecordingSink: already closed")?;
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, recording expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * Frame::CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        state.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frames_written as i64));

        state.encoder.send_frame(&yuv_frame)?;
        state.drain_packets()?;

        self.frames_written += 1;
        Ok(())
    }

    fn poll_user_stop(&mut self, _delay: Duration) -> bool {
        false
    }

    fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut state) = self.encoding.take() else {
            return Ok(());
        };

        state.encoder.send_eof()?;
        state.drain_packets()?;
        state.octx.write_trailer()?;

        log::debug!("Recording closed after {} frames", self.frames_written);
        Ok(())
    }
}
