use std::time::Duration;

use crate::display::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;

/// Decorator that reports a user stop once `limit` frames have been shown.
///
/// Lets headless runs end early the same way an interactive quit key would,
/// so the pipeline exercises its normal shutdown path.
pub struct FrameLimitSink {
    inner: Box<dyn DisplaySink>,
    limit: usize,
    shown: usize,
}

impl FrameLimitSink {
    pub fn new(inner: Box<dyn DisplaySink>, limit: usize) -> Result<Self, &'static str> {
        if limit < 1 {
            return Err("frame limit must be >= 1");
        }
        Ok(Self {
            inner,
            limit,
            shown: 0,
        })
    }
}

impl DisplaySink for FrameLimitSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.shown >= self.limit {
            return Ok(());
        }
        self.inner.show(frame)?;
        self.shown += 1;
        Ok(())
    }

    fn poll_user_stop(&mut self, delay: Duration) -> bool {
        // Always give the inner sink its poll so windows stay responsive.
        let inner_stop = self.inner.poll_user_stop(delay);
        if self.shown >= self.limit {
            log::info!("Frame limit of {} reached", self.limit);
            return true;
        }
        inner_stop
    }

    fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.inner.close_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        shown: Vec<usize>,
        polls: usize,
        closes: usize,
    }

    struct RecordingSink {
        log: Arc<Mutex<Recorded>>,
        stop_after_polls: Option<usize>,
    }

    impl DisplaySink for RecordingSink {
        fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().shown.push(frame.index());
            Ok(())
        }

        fn poll_user_stop(&mut self, _delay: Duration) -> bool {
            let mut log = self.log.lock().unwrap();
            log.polls += 1;
            self.stop_after_polls.is_some_and(|n| log.polls >= n)
        }

        fn close_all(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 12], 2, 2, index)
    }

    fn limited(limit: usize, stop_after_polls: Option<usize>) -> (FrameLimitSink, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let inner = RecordingSink {
            log: log.clone(),
            stop_after_polls,
        };
        (FrameLimitSink::new(Box::new(inner), limit).unwrap(), log)
    }

    #[test]
    fn test_zero_limit_rejected() {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let inner = RecordingSink {
            log,
            stop_after_polls: None,
        };
        assert!(FrameLimitSink::new(Box::new(inner), 0).is_err());
    }

    #[test]
    fn test_stops_after_limit() {
        let (mut sink, log) = limited(2, None);

        sink.show(&frame(0)).unwrap();
        assert!(!sink.poll_user_stop(Duration::ZERO));
        sink.show(&frame(1)).unwrap();
        assert!(sink.poll_user_stop(Duration::ZERO));

        assert_eq!(log.lock().unwrap().shown, vec![0, 1]);
        assert_eq!(log.lock().unwrap().polls, 2);
    }

    #[test]
    fn test_frames_past_limit_are_not_forwarded() {
        let (mut sink, log) = limited(1, None);
        sink.show(&frame(0)).unwrap();
        sink.show(&frame(1)).unwrap();
        assert_eq!(log.lock().unwrap().shown, vec![0]);
    }

    #[test]
    fn test_inner_stop_passes_through() {
        let (mut sink, _log) = limited(100, Some(1));
        sink.show(&frame(0)).unwrap();
        assert!(sink.poll_user_stop(Duration::ZERO));
    }

    #[test]
    fn test_close_delegates() {
        let (mut sink, log) = limited(3, None);
        sink.close_all().unwrap();
        assert_eq!(log.lock().unwrap().closes, 1);
    }
}
