pub mod ffmpeg_recording_sink;
pub mod frame_limit_sink;
#[cfg(feature = "opencv")]
pub mod highgui_window_sink;
pub mod image_sequence_sink;
