pub const FACE_CASCADE_NAME: &str = "haarcascade_frontalface_default.xml";
pub const EYE_CASCADE_NAME: &str = "haarcascade_eye.xml";
pub const SMILE_CASCADE_NAME: &str = "haarcascade_smile.xml";

/// Stock OpenCV cascades are fetched from here when not found locally.
pub const CASCADE_BASE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades";

pub const DEFAULT_WORKER_COUNT: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// How long the display stage waits for a quit key after each shown frame.
pub const DEFAULT_DISPLAY_POLL_MS: u64 = 30;

/// Frames ordered display holds behind a missing one before skipping it.
pub const DEFAULT_REORDER_WINDOW: usize = 120;

/// Used when a source reports no usable frame rate (~30 fps).
pub const FALLBACK_FRAME_INTERVAL_MS: u64 = 33;

pub const DISPLAY_WINDOW_TITLE: &str = "Recognized faces";
