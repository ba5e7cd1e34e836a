//! Spectrum snapshots for the display

use std::time::{Duration, Instant};

use crate::domain::{IqSample, SampleBlock, SpectrumFrame};
use crate::dsp::fft::FftProcessor;

/// Turns whole I/Q blocks into centered dB magnitude frames
pub struct SpectrumSnapshotter {
    fft: FftProcessor,
}

impl SpectrumSnapshotter {
    pub fn new(block_size: usize) -> Self {
        Self {
            fft: FftProcessor::new(block_size),
        }
    }

    /// One bin per input sample, spanning `center_freq ± sample_rate/2`.
    /// No window is applied.
    pub fn snapshot(&mut self, samples: &[IqSample], center_freq: f64, sample_rate: u32) -> SpectrumFrame {
        SpectrumFrame {
            center_freq,
            sample_rate,
            magnitudes_db: self.fft.compute(samples),
        }
    }

    /// Snapshot using the tuning the block was captured with
    pub fn snapshot_block(&mut self, block: &SampleBlock) -> SpectrumFrame {
        self.snapshot(&block.samples, block.center_freq, block.sample_rate)
    }
}

/// Limits snapshot publication to one per interval
#[derive(Debug, Clone)]
pub struct SnapshotThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl SnapshotThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// True (and the interval restarts) if a snapshot is due at `now`
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
