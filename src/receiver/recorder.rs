//! In-memory capture of demodulated audio while recording is armed

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::AudioSample;

#[derive(Default)]
struct RecordBuffer {
    armed: bool,
    samples: Vec<AudioSample>,
}

/// Accumulates every demodulated block while armed. Safe to share between
/// the acquisition thread (append) and the controller (arm/disarm).
#[derive(Default)]
pub struct Recorder {
    inner: Mutex<RecordBuffer>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, RecordBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a fresh recording, discarding anything captured before
    pub fn arm(&self) {
        let mut buf = self.buffer();
        buf.samples.clear();
        buf.armed = true;
    }

    /// Stop recording and hand back the captured audio
    pub fn disarm(&self) -> Vec<AudioSample> {
        let mut buf = self.buffer();
        buf.armed = false;
        std::mem::take(&mut buf.samples)
    }

    pub fn is_armed(&self) -> bool {
        self.buffer().armed
    }

    /// No-op unless armed
    pub fn append(&self, block: &[AudioSample]) {
        let mut buf = self.buffer();
        if buf.armed {
            buf.samples.extend_from_slice(block);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_only_while_armed() {
        let rec = Recorder::new();
        rec.append(&[1.0, 2.0]);
        assert!(rec.is_empty());

        rec.arm();
        rec.append(&[0.1, 0.2]);
        rec.append(&[0.3]);
        assert_eq!(rec.len(), 3);

        assert_eq!(rec.disarm(), vec![0.1, 0.2, 0.3]);
        assert!(!rec.is_armed());
        rec.append(&[9.0]);
        assert!(rec.is_empty());
    }

    #[test]
    fn rearm_starts_fresh() {
        let rec = Recorder::new();
        rec.arm();
        rec.append(&[0.5; 10]);
        rec.arm();
        assert!(rec.is_empty());
        assert!(rec.is_armed());
    }
}
