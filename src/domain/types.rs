//! Core domain types

use std::time::Instant;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use super::error::{FmError, FmResult};

/// Audio sample type (32-bit float, range -1.0 to 1.0)
pub type AudioSample = f32;

/// Complex baseband I/Q sample
pub type IqSample = Complex<f32>;

/// Demodulated mono audio at the audio rate
pub type AudioBlock = Vec<AudioSample>;

/// Frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    /// Parse user-entered MHz text such as `"99.5"` or `" 101.2 "`.
    pub fn parse_mhz(text: &str) -> FmResult<Self> {
        let mhz: f64 = text
            .trim()
            .parse()
            .map_err(|_| FmError::Config(format!("Invalid frequency format: '{}'", text.trim())))?;
        if !mhz.is_finite() || mhz <= 0.0 {
            return Err(FmError::Config(format!("Invalid frequency: {mhz} MHz")));
        }
        Ok(Self::mhz(mhz))
    }
}

/// Tuner gain setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainMode {
    /// Tuner AGC
    #[default]
    Auto,
    /// Manual gain in dB
    Manual(f32),
}

impl std::str::FromStr for GainMode {
    type Err = FmError;

    fn from_str(s: &str) -> FmResult<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<f32>()
            .ok()
            .filter(|db| db.is_finite())
            .map(Self::Manual)
            .ok_or_else(|| FmError::Config(format!("Invalid gain '{s}' (expected 'auto' or dB)")))
    }
}

impl std::fmt::Display for GainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual(db) => write!(f, "{db:.1} dB"),
        }
    }
}

/// A block of I/Q samples tagged with the tuning in effect when it was captured
#[derive(Debug, Clone)]
pub struct SampleBlock {
    pub samples: Vec<IqSample>,
    pub sample_rate: u32,
    pub center_freq: f64,
}

impl SampleBlock {
    pub fn new(samples: Vec<IqSample>, sample_rate: u32, center_freq: f64) -> Self {
        Self {
            samples,
            sample_rate,
            center_freq,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Latest power estimate published by the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    /// dBm-like power estimate
    pub dbm: f32,
    pub at: Instant,
}

/// Power reported before the first block arrives
pub const NO_SIGNAL_DBM: f32 = -120.0;

impl PowerReading {
    pub fn new(dbm: f32, at: Instant) -> Self {
        Self { dbm, at }
    }

    /// S-meter reading: one S-unit per 6 dB above -127 dBm, clamped to S0..S9
    pub fn s_units(&self) -> u8 {
        ((self.dbm + 127.0) / 6.0).floor().clamp(0.0, 9.0) as u8
    }
}

impl Default for PowerReading {
    fn default() -> Self {
        Self::new(NO_SIGNAL_DBM, Instant::now())
    }
}

/// Live tuning parameters, published as a whole snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningState {
    pub center_freq: f64,
    pub gain: GainMode,
    /// Output volume, 0.0..=1.0
    pub volume: f32,
}

/// Band scanner state. Only the scan loop moves it out of `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ScanState {
    #[default]
    Idle,
    Sweeping,
    PausedOnPeak {
        since: Instant,
        peak_freq: f64,
    },
}

/// Magnitude spectrum of one sample block, bins ordered from
/// `start_freq()` upwards in steps of `sample_rate / len`
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub center_freq: f64,
    pub sample_rate: u32,
    pub magnitudes_db: Vec<f32>,
}

impl SpectrumFrame {
    pub fn len(&self) -> usize {
        self.magnitudes_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes_db.is_empty()
    }

    /// Frequency of the lowest bin. Equals `center_freq - sample_rate/2`
    /// for even lengths; odd lengths keep the center bin on `center_freq`.
    pub fn start_freq(&self) -> f64 {
        self.bin_frequency(0)
    }

    /// Frequency of bin `index`
    pub fn bin_frequency(&self, index: usize) -> f64 {
        let n = self.magnitudes_db.len().max(1) as f64;
        let half = (self.magnitudes_db.len() / 2) as f64;
        self.center_freq + (index as f64 - half) * f64::from(self.sample_rate) / n
    }
}
