//! In-memory audio output for tests and headless runs (`--no-audio`)
//!
//! Captures every written sample instead of playing it. Writes return
//! immediately, so playback drains the queue as fast as it fills.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{AudioSample, FmError, FmResult};
use crate::ports::AudioOutput;

#[derive(Default)]
pub struct MockAudioOutput {
    captured: Arc<Mutex<Vec<AudioSample>>>,
    running: bool,
    /// Fail `start` with an audio device error
    fail_start: bool,
    /// Keep at most this many samples (newest dropped), `None` for unbounded
    limit: Option<usize>,
}

impl MockAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard audio instead of capturing it
    pub fn discarding() -> Self {
        Self {
            limit: Some(0),
            ..Self::default()
        }
    }

    /// An output whose device can never be opened
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Handle to the captured samples, readable after the output moves threads
    pub fn captured(&self) -> Arc<Mutex<Vec<AudioSample>>> {
        self.captured.clone()
    }
}

impl AudioOutput for MockAudioOutput {
    fn start(&mut self, sample_rate: u32, block_size: usize) -> FmResult<()> {
        if self.fail_start {
            return Err(FmError::AudioDevice("Mock output device unavailable".into()));
        }
        log::debug!("[MOCK AUDIO] start {sample_rate} Hz, {block_size}-sample blocks");
        self.running = true;
        Ok(())
    }

    fn write(&mut self, samples: &[AudioSample]) -> FmResult<()> {
        if !self.running {
            return Err(FmError::AudioDevice("Mock output not started".into()));
        }
        let mut captured = self.captured.lock().unwrap_or_else(PoisonError::into_inner);
        let room = self
            .limit
            .map_or(samples.len(), |limit| limit.saturating_sub(captured.len()));
        captured.extend_from_slice(&samples[..room.min(samples.len())]);
        Ok(())
    }

    fn stop(&mut self) -> FmResult<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_written_blocks_in_order() {
        let mut out = MockAudioOutput::new();
        let captured = out.captured();
        out.start(48_000, 2_400).unwrap();
        out.write(&[0.1, 0.2]).unwrap();
        out.write(&[0.3]).unwrap();
        out.stop().unwrap();
        assert_eq!(*captured.lock().unwrap(), vec![0.1, 0.2, 0.3]);
        assert!(!out.is_running());
    }

    #[test]
    fn write_requires_start() {
        let mut out = MockAudioOutput::new();
        assert!(out.write(&[0.0]).is_err());
    }

    #[test]
    fn discarding_keeps_nothing() {
        let mut out = MockAudioOutput::discarding();
        let captured = out.captured();
        out.start(48_000, 2_400).unwrap();
        out.write(&[0.5; 100]).unwrap();
        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_output_refuses_to_start() {
        let mut out = MockAudioOutput::failing();
        assert!(matches!(out.start(48_000, 2_400), Err(FmError::AudioDevice(_))));
    }
}
