//! Synthetic FM band: SampleSource for development and tests without hardware
//!
//! Every configured station transmits a 1 kHz tone at 75 kHz deviation.
//! Stations are attenuated by a Gaussian tuner passband around the center
//! frequency, so power peaks when tuned exactly onto a station, as it does
//! with a real dongle.

use std::thread;
use std::time::{Duration, Instant};

use num_complex::Complex;

use crate::domain::{FmError, FmResult, GainMode, IqSample, SampleBlock};
use crate::dsp::nco::Nco;
use crate::ports::{LazyTuning, SampleSource};

const TONE_HZ: f64 = 1_000.0;
const DEVIATION_HZ: f64 = 75_000.0;
/// 1/e amplitude point of the simulated tuner passband
const PASSBAND_HZ: f64 = 80_000.0;
const DEFAULT_NOISE_DBM: f32 = -70.0;

/// Linear mean power for a dBm-like level (inverse of `power_dbm`)
fn dbm_to_power(dbm: f32) -> f64 {
    10f64.powf((f64::from(dbm) + 30.0) / 10.0)
}

struct Transmitter {
    freq_hz: f64,
    amplitude: f64,
    carrier: Nco,
}

pub struct SyntheticSource {
    sample_rate: u32,
    tuning: LazyTuning,
    stations: Vec<Transmitter>,
    noise_amplitude: f32,
    rng_state: u64,
    sample_index: u64,
    realtime: bool,
    started: Option<Instant>,
    /// Fail with a hardware error once this many blocks have been read
    fail_after: Option<u64>,
    blocks_read: u64,
}

impl SyntheticSource {
    pub fn new(sample_rate: u32, center_freq: f64) -> Self {
        let mut source = Self {
            sample_rate,
            tuning: LazyTuning::new(center_freq, GainMode::Auto),
            stations: Vec::new(),
            noise_amplitude: 0.0,
            rng_state: 0x2545_F491_4F6C_DD1D,
            sample_index: 0,
            realtime: false,
            started: None,
            fail_after: None,
            blocks_read: 0,
        };
        source.set_noise_floor(DEFAULT_NOISE_DBM);
        source
    }

    /// A handful of strong stations spread across the broadcast band
    pub fn demo_band(sample_rate: u32, center_freq: f64) -> Self {
        Self::new(sample_rate, center_freq)
            .with_station(88.3e6, -22.0)
            .with_station(94.1e6, -18.0)
            .with_station(99.5e6, -25.0)
            .with_station(104.7e6, -20.0)
            .realtime(true)
    }

    /// Add a station whose power reads `power_dbm` when tuned exactly onto it
    pub fn with_station(mut self, freq_hz: f64, power_dbm: f32) -> Self {
        self.stations.push(Transmitter {
            freq_hz,
            amplitude: dbm_to_power(power_dbm).sqrt(),
            carrier: Nco::new(0.0, f64::from(self.sample_rate)),
        });
        self
    }

    pub fn with_noise_floor(mut self, noise_dbm: f32) -> Self {
        self.set_noise_floor(noise_dbm);
        self
    }

    pub fn realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    /// Simulate the device disappearing after `blocks` reads
    pub fn fail_after(mut self, blocks: u64) -> Self {
        self.fail_after = Some(blocks);
        self
    }

    fn set_noise_floor(&mut self, noise_dbm: f32) {
        // Uniform on [-a, a] per component has mean |n|^2 = 2a^2/3
        self.noise_amplitude = (1.5 * dbm_to_power(noise_dbm)).sqrt() as f32;
    }

    /// xorshift64*, uniform in -1.0..1.0
    fn next_noise(&mut self) -> f32 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 40;
        (bits as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }

    fn generate(&mut self, n: usize, center_freq: f64) -> Vec<IqSample> {
        let half_span = f64::from(self.sample_rate) / 2.0;
        let rate = f64::from(self.sample_rate);
        let mut samples = vec![Complex::new(0.0f32, 0.0); n];

        for tx in &mut self.stations {
            let offset = tx.freq_hz - center_freq;
            if offset.abs() >= half_span {
                continue;
            }
            let gain = (tx.amplitude * (-(offset / PASSBAND_HZ).powi(2)).exp()) as f32;
            for (i, sample) in samples.iter_mut().enumerate() {
                let t = (self.sample_index + i as u64) as f64 / rate;
                let deviation = DEVIATION_HZ * (2.0 * std::f64::consts::PI * TONE_HZ * t).sin();
                tx.carrier.set_frequency(offset + deviation);
                *sample += tx.carrier.next_iq() * gain;
            }
        }

        for sample in samples.iter_mut() {
            let re = self.next_noise() * self.noise_amplitude;
            let im = self.next_noise() * self.noise_amplitude;
            *sample += Complex::new(re, im);
        }

        self.sample_index += n as u64;
        samples
    }

    fn pace(&mut self) {
        let started = *self.started.get_or_insert_with(Instant::now);
        if !self.realtime {
            return;
        }
        let due = started
            + Duration::from_secs_f64(self.sample_index as f64 / f64::from(self.sample_rate));
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
    }
}

impl SampleSource for SyntheticSource {
    fn set_center_freq(&mut self, freq_hz: f64) {
        self.tuning.request_freq(freq_hz);
    }

    fn set_gain(&mut self, gain: GainMode) {
        self.tuning.request_gain(gain);
    }

    fn read_block(&mut self, n: usize) -> FmResult<SampleBlock> {
        if self.fail_after.is_some_and(|limit| self.blocks_read >= limit) {
            return Err(FmError::Hardware("Synthetic device disconnected".into()));
        }
        if let Some(freq) = self.tuning.pending_freq() {
            log::trace!("Synthetic tuner at {:.3} MHz", freq / 1e6);
            self.tuning.mark_freq_applied(freq);
        }
        if let Some(gain) = self.tuning.pending_gain() {
            self.tuning.mark_gain_applied(gain);
        }

        let center = self.tuning.applied_freq();
        let samples = self.generate(n, center);
        self.pace();
        self.blocks_read += 1;
        Ok(SampleBlock::new(samples, self.sample_rate, center))
    }

    fn close(&mut self) -> FmResult<()> {
        log::debug!("Synthetic source closed after {} blocks", self.blocks_read);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn center_freq(&self) -> f64 {
        self.tuning.applied_freq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::power_dbm;

    #[test]
    fn power_reads_station_level_on_frequency() {
        let mut source = SyntheticSource::new(288_000, 94.1e6)
            .with_station(94.1e6, -20.0)
            .with_noise_floor(-90.0);
        let block = source.read_block(8192).unwrap();
        assert!((power_dbm(&block.samples) - -20.0).abs() < 0.5);
    }

    #[test]
    fn power_peaks_on_station() {
        let mut source = SyntheticSource::new(288_000, 94.0e6).with_station(94.1e6, -20.0);
        let mut levels = Vec::new();
        for freq in [93.9e6, 94.0e6, 94.1e6, 94.2e6, 94.3e6] {
            source.set_center_freq(freq);
            levels.push(power_dbm(&source.read_block(4096).unwrap().samples));
        }
        assert!(levels[2] > levels[1] && levels[1] > levels[0]);
        assert!(levels[2] > levels[3] && levels[3] > levels[4]);
    }

    #[test]
    fn empty_band_reads_noise_floor() {
        let mut source = SyntheticSource::new(288_000, 100e6).with_noise_floor(-70.0);
        let block = source.read_block(8192).unwrap();
        assert!((power_dbm(&block.samples) - -70.0).abs() < 1.0);
    }

    #[test]
    fn blocks_carry_applied_frequency() {
        let mut source = SyntheticSource::new(288_000, 100e6);
        source.set_center_freq(101e6);
        let block = source.read_block(64).unwrap();
        assert_eq!(block.center_freq, 101e6);
        assert_eq!(block.sample_rate, 288_000);
    }

    #[test]
    fn fails_like_unplugged_device() {
        let mut source = SyntheticSource::new(288_000, 100e6).fail_after(2);
        assert!(source.read_block(64).is_ok());
        assert!(source.read_block(64).is_ok());
        assert!(matches!(source.read_block(64), Err(FmError::Hardware(_))));
    }

    #[test]
    fn noise_stays_in_unit_range() {
        let mut source = SyntheticSource::new(288_000, 100e6);
        for _ in 0..10_000 {
            let x = source.next_noise();
            assert!((-1.0..1.0).contains(&x));
        }
    }
}
