//! Bounded FIFO of demodulated audio blocks between acquisition and playback
//!
//! When the queue is full the newest block is rejected and the producer moves
//! on, so acquisition never waits on the sound card.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::domain::{AudioBlock, FmError, FmResult};

pub struct AudioSink {
    tx: Sender<AudioBlock>,
    rx: Receiver<AudioBlock>,
    capacity: usize,
}

impl AudioSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Enqueue without blocking. Returns `FmError::QueueFull` and drops
    /// `block` if the queue is at capacity.
    pub fn push(&self, block: AudioBlock) -> FmResult<()> {
        match self.tx.try_send(block) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(FmError::QueueFull),
            // Unreachable while `self` holds the receiver
            Err(TrySendError::Disconnected(_)) => Err(FmError::QueueFull),
        }
    }

    /// Wait up to `timeout` for the oldest block
    pub fn pull(&self, timeout: Duration) -> Option<AudioBlock> {
        match self.rx.recv_timeout(timeout) {
            Ok(block) => Some(block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard queued blocks, returning how many were dropped
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }
}
