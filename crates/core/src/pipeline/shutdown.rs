use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

/// The two one-way termination flags shared by every pipeline thread.
///
/// Both flags only ever go from `false` to `true`. A stop request also
/// disconnects an internal channel so threads parked in a channel `select`
/// wake up immediately instead of polling the flag.
pub struct ShutdownSignal {
    capture_exhausted: AtomicBool,
    stop_requested: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        Self {
            capture_exhausted: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
        }
    }

    /// Producer -> consumers: no more jobs will be enqueued.
    pub fn mark_capture_exhausted(&self) {
        self.capture_exhausted.store(true, Ordering::Release);
    }

    pub fn is_capture_exhausted(&self) -> bool {
        self.capture_exhausted.load(Ordering::Acquire)
    }

    /// Asks every loop to finish at its next check. Idempotent.
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::AcqRel) {
            log::debug!("Stop requested");
        }
        // Dropping the only sender disconnects `stop_rx` for all selectors.
        self.stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Becomes ready (disconnected) once a stop has been requested.
    pub(crate) fn stopped(&self) -> &Receiver<()> {
        &self.stop_rx
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_flags_start_clear() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_capture_exhausted());
        assert!(!signal.is_stop_requested());
    }

    #[test]
    fn test_flags_are_independent() {
        let signal = ShutdownSignal::new();
        signal.mark_capture_exhausted();
        assert!(signal.is_capture_exhausted());
        assert!(!signal.is_stop_requested());
    }

    #[test]
    fn test_request_stop_is_idempotent() {
        let signal = ShutdownSignal::new();
        signal.request_stop();
        signal.request_stop();
        assert!(signal.is_stop_requested());
    }

    #[test]
    fn test_stop_wakes_channel_waiter() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            std::thread::spawn(move || signal.stopped().recv_timeout(Duration::from_secs(5)))
        };

        std::thread::sleep(Duration::from_millis(20));
        signal.request_stop();

        let result = waiter.join().unwrap();
        assert!(matches!(
            result,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        ));
    }
}
