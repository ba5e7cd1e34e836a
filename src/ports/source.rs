//! Sample source port trait

use crate::domain::{FmResult, GainMode, SampleBlock};

/// Trait for an RF front-end streaming complex baseband samples
///
/// Note: no `Send` bound. hardware handles (librtlsdr device pointers) are
/// not thread-safe, so sources are opened on the acquisition thread that
/// reads from them.
pub trait SampleSource {
    /// Request a new center frequency. Applied at the start of the next read.
    fn set_center_freq(&mut self, freq_hz: f64);

    /// Request a new gain mode. Applied at the start of the next read.
    fn set_gain(&mut self, gain: GainMode);

    /// Block until `n` samples are available and return them
    fn read_block(&mut self, n: usize) -> FmResult<SampleBlock>;

    /// Release the device
    fn close(&mut self) -> FmResult<()>;

    fn sample_rate(&self) -> u32;

    /// Center frequency currently applied to the device
    fn center_freq(&self) -> f64;
}

/// Opens a source on the thread that will own it
pub type SourceFactory = Box<dyn FnOnce() -> FmResult<Box<dyn SampleSource>> + Send + 'static>;

/// Requested-vs-applied tuning bookkeeping shared by source adapters.
///
/// Setters only record the request; `pending_*` reports a value only while it
/// differs from what the hardware already has, so redundant retunes never
/// reach the device.
#[derive(Debug, Clone)]
pub struct LazyTuning {
    requested_freq: f64,
    applied_freq: f64,
    requested_gain: GainMode,
    applied_gain: GainMode,
}

impl LazyTuning {
    /// Start from settings the device was opened with
    pub fn new(freq_hz: f64, gain: GainMode) -> Self {
        Self {
            requested_freq: freq_hz,
            applied_freq: freq_hz,
            requested_gain: gain,
            applied_gain: gain,
        }
    }

    pub fn request_freq(&mut self, freq_hz: f64) {
        self.requested_freq = freq_hz;
    }

    pub fn request_gain(&mut self, gain: GainMode) {
        self.requested_gain = gain;
    }

    /// Pending frequency change, if any
    pub fn pending_freq(&self) -> Option<f64> {
        (self.requested_freq != self.applied_freq).then_some(self.requested_freq)
    }

    /// Pending gain change, if any
    pub fn pending_gain(&self) -> Option<GainMode> {
        (self.requested_gain != self.applied_gain).then_some(self.requested_gain)
    }

    /// Record that the device accepted `freq_hz`
    pub fn mark_freq_applied(&mut self, freq_hz: f64) {
        self.applied_freq = freq_hz;
    }

    pub fn mark_gain_applied(&mut self, gain: GainMode) {
        self.applied_gain = gain;
    }

    pub fn applied_freq(&self) -> f64 {
        self.applied_freq
    }

    pub fn applied_gain(&self) -> GainMode {
        self.applied_gain
    }
}
