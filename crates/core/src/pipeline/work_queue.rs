use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};

use crate::pipeline::error::PipelineError;
use crate::pipeline::shutdown::ShutdownSignal;

/// Why a job was handed back instead of being queued.
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError<T> {
    /// The queue holds `capacity` jobs. Only returned by `try_enqueue`.
    Full(T),
    /// Stop was requested or the queue was shut down.
    Closed(T),
}

impl<T> EnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::Full(job) | EnqueueError::Closed(job) => job,
        }
    }
}

/// Bounded FIFO between the capture loop and the detection workers.
///
/// Carries the pipeline's [`ShutdownSignal`] so every blocking call can be
/// woken by either end of capture or a stop request. Shared via `Arc`.
pub struct WorkQueue<T> {
    sender: Mutex<Option<Sender<T>>>,
    receiver: Receiver<T>,
    capacity: usize,
    signal: ShutdownSignal,
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "queue capacity must be >= 1".into(),
            ));
        }
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            capacity,
            signal: ShutdownSignal::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs waiting to be picked up.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    fn current_sender(&self) -> Option<Sender<T>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queues `job` without waiting.
    pub fn try_enqueue(&self, job: T) -> Result<(), EnqueueError<T>> {
        if self.signal.is_stop_requested() {
            return Err(EnqueueError::Closed(job));
        }
        let Some(tx) = self.current_sender() else {
            return Err(EnqueueError::Closed(job));
        };
        tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => EnqueueError::Full(job),
            TrySendError::Disconnected(job) => EnqueueError::Closed(job),
        })
    }

    /// Queues `job`, waiting for space. A stop request while waiting hands
    /// the job back as `Closed`.
    pub fn enqueue(&self, job: T) -> Result<(), EnqueueError<T>> {
        if self.signal.is_stop_requested() {
            return Err(EnqueueError::Closed(job));
        }
        let Some(tx) = self.current_sender() else {
            return Err(EnqueueError::Closed(job));
        };

        let stopped = self.signal.stopped();
        let mut sel = Select::new();
        let send_op = sel.send(&tx);
        sel.recv(stopped);

        let oper = sel.select();
        if oper.index() == send_op {
            oper.send(&tx, job)
                .map_err(|e| EnqueueError::Closed(e.into_inner()))
        } else {
            let _ = oper.recv(stopped);
            Err(EnqueueError::Closed(job))
        }
    }

    /// Takes the oldest job, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is drained after [`shutdown`], or as
    /// soon as a stop is requested (queued jobs are then abandoned).
    ///
    /// [`shutdown`]: WorkQueue::shutdown
    pub fn dequeue(&self) -> Option<T> {
        if self.signal.is_stop_requested() {
            return None;
        }

        let stopped = self.signal.stopped();
        let mut sel = Select::new();
        let recv_op = sel.recv(&self.receiver);
        sel.recv(stopped);

        let oper = sel.select();
        if oper.index() == recv_op {
            // Disconnected means capture ended and every job was taken.
            oper.recv(&self.receiver).ok()
        } else {
            let _ = oper.recv(stopped);
            None
        }
    }

    /// Marks capture exhausted and wakes idle consumers. Jobs already queued
    /// are still handed out.
    pub fn shutdown(&self) {
        self.signal.mark_capture_exhausted();
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
