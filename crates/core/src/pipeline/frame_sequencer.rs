use std::collections::BTreeMap;

/// Restores capture order for frames finished by concurrent workers.
///
/// Items are released only when every lower sequence number has been
/// released before them. A sequence number that never arrives (its worker
/// died) is skipped once more than `window` items are held behind it.
pub struct FrameSequencer<T> {
    pending: BTreeMap<u64, T>,
    next: u64,
    window: usize,
}

impl<T> FrameSequencer<T> {
    /// A sequencer that waits for gaps until `flush`.
    pub fn new() -> Self {
        Self::with_window(usize::MAX)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            next: 0,
            window: window.max(1),
        }
    }

    /// Accepts `item` and returns everything that is now in order.
    pub fn push(&mut self, sequence: u64, item: T) -> Vec<T> {
        if sequence < self.next {
            log::warn!("Dropping late or duplicate frame sequence {sequence}");
            return Vec::new();
        }
        self.pending.insert(sequence, item);

        let mut ready = Vec::new();
        self.release_in_order(&mut ready);
        while self.pending.len() > self.window {
            let Some(&first) = self.pending.keys().next() else {
                break;
            };
            log::warn!(
                "Skipping missing frame sequences {}..{first}: {} frames held",
                self.next,
                self.pending.len()
            );
            self.next = first;
            self.release_in_order(&mut ready);
        }
        ready
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Releases whatever is still held, in sequence order, skipping gaps.
    pub fn flush(&mut self) -> Vec<T> {
        let rest = std::mem::take(&mut self.pending);
        if let Some(&last) = rest.keys().next_back() {
            self.next = last + 1;
        }
        rest.into_values().collect()
    }

    fn release_in_order(&mut self, ready: &mut Vec<T>) {
        while let Some(item) = self.pending.remove(&self.next) {
            ready.push(item);
            self.next += 1;
        }
    }
}

impl<T> Default for FrameSequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}
