//! Receiver configuration
//!
//! Every field has a default so a partial JSON file (or none at all) yields a
//! working receiver. `validate()` is the single gate for invariants the DSP
//! chain relies on, most importantly the integer decimation ratio.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{FmError, FmResult};
use super::types::GainMode;

/// FM broadcast band limits in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            low_hz: 87_500_000.0,
            high_hz: 108_000_000.0,
        }
    }
}

impl BandConfig {
    pub fn contains(&self, hz: f64) -> bool {
        (self.low_hz..=self.high_hz).contains(&hz)
    }

    pub fn clamp(&self, hz: f64) -> f64 {
        hz.clamp(self.low_hz, self.high_hz)
    }
}

/// Band scanner parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub step_hz: f64,
    /// Power a climb must exceed before a fall counts as a peak
    pub threshold_dbm: f32,
    /// Resume sweeping once power drops below `threshold_dbm - hysteresis_db`
    pub hysteresis_db: f32,
    pub dwell_ms: u64,
    /// Time allowed for the source to retune before power is sampled
    pub settle_ms: u64,
    pub pause_poll_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step_hz: 100_000.0,
            threshold_dbm: -35.0,
            hysteresis_db: 5.0,
            dwell_ms: 5_000,
            settle_ms: 30,
            pause_poll_ms: 200,
        }
    }
}

impl ScanConfig {
    pub fn squelch_dbm(&self) -> f32 {
        self.threshold_dbm - self.hysteresis_db
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }
}

/// Top-level receiver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// I/Q sample rate in Hz; must be an integer multiple of `audio_rate`
    pub sample_rate: u32,
    pub audio_rate: u32,
    /// Complex samples per acquisition read
    pub block_size: usize,
    /// Audio queue capacity in blocks
    pub queue_capacity: usize,
    pub spectrum_interval_ms: u64,
    pub initial_freq_hz: f64,
    pub gain: GainMode,
    pub volume: f32,
    pub device_index: u32,
    pub stations_file: PathBuf,
    pub recordings_dir: PathBuf,
    pub band: BandConfig,
    pub scan: ScanConfig,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 288_000,
            audio_rate: 48_000,
            block_size: 8 * 1024,
            queue_capacity: 10,
            spectrum_interval_ms: 100,
            initial_freq_hz: 100_000_000.0,
            gain: GainMode::Auto,
            volume: 0.5,
            device_index: 0,
            stations_file: PathBuf::from("stations.json"),
            recordings_dir: PathBuf::from("."),
            band: BandConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl RadioConfig {
    /// Load a JSON configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> FmResult<Self> {
        if !path.exists() {
            log::info!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| FmError::Config(format!("Failed to read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| FmError::Config(format!("Failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Exact integer ratio between the I/Q rate and the audio rate
    pub fn decimation(&self) -> FmResult<usize> {
        decimation_factor(self.sample_rate, self.audio_rate)
    }

    /// Audio output block size (50 ms)
    pub fn audio_block_size(&self) -> usize {
        (self.audio_rate / 20) as usize
    }

    pub fn spectrum_interval(&self) -> Duration {
        Duration::from_millis(self.spectrum_interval_ms)
    }

    pub fn validate(&self) -> FmResult<()> {
        self.decimation()?;
        if self.block_size < 2 {
            return Err(FmError::Config("Block size must be at least 2 samples".into()));
        }
        if self.queue_capacity == 0 {
            return Err(FmError::Config("Queue capacity must be at least 1 block".into()));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(FmError::Config(format!("Volume {} outside 0.0..=1.0", self.volume)));
        }
        if self.band.low_hz >= self.band.high_hz {
            return Err(FmError::Config(format!(
                "Band lower edge {} Hz must be below upper edge {} Hz",
                self.band.low_hz, self.band.high_hz
            )));
        }
        if self.scan.step_hz <= 0.0 {
            return Err(FmError::Config("Scan step must be positive".into()));
        }
        Ok(())
    }
}

/// Decimation factor for `sample_rate -> audio_rate`, rejecting non-integer ratios
pub fn decimation_factor(sample_rate: u32, audio_rate: u32) -> FmResult<usize> {
    if audio_rate == 0 || sample_rate == 0 {
        return Err(FmError::Config("Sample and audio rates must be non-zero".into()));
    }
    if sample_rate % audio_rate != 0 {
        return Err(FmError::Config(format!(
            "Sample rate {sample_rate} Hz is not an integer multiple of audio rate {audio_rate} Hz (ratio {:.2})",
            f64::from(sample_rate) / f64::from(audio_rate)
        )));
    }
    Ok((sample_rate / audio_rate) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_has_sensible_values() {
        let config = RadioConfig::default();
        assert_eq!(config.sample_rate, 288_000);
        assert_eq!(config.audio_rate, 48_000);
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.decimation().unwrap(), 6);
        assert_eq!(config.audio_block_size(), 2400);
        assert_eq!(config.scan.squelch_dbm(), -40.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_integer_decimation_is_rejected() {
        assert_eq!(decimation_factor(288_000, 48_000).unwrap(), 6);
        assert!(matches!(decimation_factor(300_000, 48_000), Err(FmError::Config(_))));
        assert!(matches!(decimation_factor(288_000, 0), Err(FmError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RadioConfig =
            serde_json::from_str(r#"{"sample_rate": 240000, "scan": {"threshold_dbm": -30.0}}"#).unwrap();
        assert_eq!(config.sample_rate, 240_000);
        assert_eq!(config.scan.threshold_dbm, -30.0);
        assert_eq!(config.scan.step_hz, 100_000.0);
        assert_eq!(config.band, BandConfig::default());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RadioConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, RadioConfig::default());
    }

    #[test]
    fn load_rejects_invalid_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio.json");
        std::fs::write(&path, r#"{"sample_rate": 300000}"#).unwrap();
        assert!(matches!(RadioConfig::load(&path), Err(FmError::Config(_))));
    }

    #[test]
    fn band_clamps_manual_tuning() {
        let band = BandConfig::default();
        assert_eq!(band.clamp(80e6), 87.5e6);
        assert_eq!(band.clamp(120e6), 108e6);
        assert!(band.contains(99.5e6));
        assert!(!band.contains(86e6));
    }
}
