//! Wideband FM demodulator: converts I/Q blocks to mono audio
//!
//! Pipeline: I/Q → quadrature discriminator → FIR decimation to the audio rate
//!           → peak normalization to the volume → 75 µs de-emphasis → f32 PCM
//!
//! Decimator history and de-emphasis memory persist between calls. Each call
//! restarts the decimation phase, so the `(n - 1) % factor` samples left over
//! from a block shift the output grid by that many input samples at the
//! block boundary.

use crate::domain::{decimation_factor, AudioBlock, FmError, FmResult, IqSample};
use crate::dsp::deemphasis::{Deemphasis, TAU_75_US};
use crate::dsp::filter::FirDecimator;

/// Below this peak a block is treated as silence and not normalized
pub const SILENCE_PEAK: f32 = 1e-5;

pub struct FmDemodulator {
    decimator: FirDecimator,
    deemphasis: Deemphasis,
    sample_rate: u32,
    audio_rate: u32,
}

impl FmDemodulator {
    /// Fails with `FmError::Config` unless `sample_rate` is an exact multiple of `audio_rate`
    pub fn new(sample_rate: u32, audio_rate: u32) -> FmResult<Self> {
        let factor = decimation_factor(sample_rate, audio_rate)?;
        Ok(Self {
            decimator: FirDecimator::for_output_rate(factor, audio_rate),
            deemphasis: Deemphasis::new(audio_rate, TAU_75_US),
            sample_rate,
            audio_rate,
        })
    }

    pub fn decimation(&self) -> usize {
        self.decimator.factor()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn audio_rate(&self) -> u32 {
        self.audio_rate
    }

    /// Audio length produced for an input block of `n` samples
    pub fn output_len(&self, n: usize) -> usize {
        n.saturating_sub(1) / self.decimation()
    }

    /// Demodulate one block. Returns `FmError::Demodulation` if any stage
    /// yields a non-finite value; filter memory is left clean in that case.
    pub fn demodulate(&mut self, samples: &[IqSample], volume: f32) -> FmResult<AudioBlock> {
        let phase = discriminate(samples);
        let mut audio = self.decimator.process(&phase);

        peak_normalize(&mut audio, volume);

        if let Some(idx) = audio.iter().position(|s| !s.is_finite()) {
            self.decimator.reset();
            return Err(FmError::Demodulation(format!(
                "non-finite audio sample at index {idx} of {}",
                audio.len()
            )));
        }

        self.deemphasis.process_block(&mut audio);
        Ok(audio)
    }

    /// Demodulate, substituting digital silence of the expected length on a fault
    pub fn demodulate_or_silence(&mut self, samples: &[IqSample], volume: f32) -> AudioBlock {
        match self.demodulate(samples, volume) {
            Ok(audio) => audio,
            Err(e) => {
                log::warn!("{e}; substituting silence");
                vec![0.0; self.output_len(samples.len())]
            }
        }
    }

    pub fn deemphasis(&self) -> &Deemphasis {
        &self.deemphasis
    }

    /// Clear all filter memory (e.g. when a new session starts)
    pub fn reset(&mut self) {
        self.decimator.reset();
        self.deemphasis.reset();
    }
}

/// Quadrature discriminator: `arg(s[i] · conj(s[i-1]))`, `n - 1` outputs in radians
pub fn discriminate(samples: &[IqSample]) -> Vec<f32> {
    samples
        .windows(2)
        .map(|pair| (pair[1] * pair[0].conj()).arg())
        .collect()
}

/// Scale so the block peak equals `volume`. Near-silent blocks only get the
/// flat volume factor, so noise is never amplified.
pub fn peak_normalize(block: &mut [f32], volume: f32) {
    let peak = block.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    let gain = if peak > SILENCE_PEAK { volume / peak } else { volume };
    for sample in block.iter_mut() {
        *sample *= gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn fm_tone(n: usize, tone_hz: f32, deviation_hz: f32, sample_rate: f32) -> Vec<IqSample> {
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate;
                let inst = deviation_hz * (2.0 * std::f32::consts::PI * tone_hz * t).sin();
                phase += 2.0 * std::f32::consts::PI * inst / sample_rate;
                Complex::from_polar(0.5, phase)
            })
            .collect()
    }

    #[test]
    fn accepts_integer_ratio() {
        let demod = FmDemodulator::new(288_000, 48_000).unwrap();
        assert_eq!(demod.decimation(), 6);
    }

    #[test]
    fn rejects_fractional_ratio() {
        assert!(matches!(
            FmDemodulator::new(300_000, 48_000),
            Err(FmError::Config(_))
        ));
    }

    #[test]
    fn discriminator_recovers_constant_offset() {
        // Tone 28.8 kHz above center at 288 kS/s advances 0.2π per sample
        let samples: Vec<IqSample> = (0..16)
            .map(|i| Complex::from_polar(1.0, 0.2 * std::f32::consts::PI * i as f32))
            .collect();
        let phase = discriminate(&samples);
        assert_eq!(phase.len(), 15);
        for p in phase {
            assert!((p - 0.2 * std::f32::consts::PI).abs() < 1e-4);
        }
    }

    #[test]
    fn output_length_is_floor_of_n_minus_one() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        for n in [2usize, 6, 7, 8, 14, 1024, 8192] {
            let block = fm_tone(n, 1000.0, 75_000.0, 288_000.0);
            let audio = demod.demodulate(&block, 0.5).unwrap();
            assert_eq!(audio.len(), (n - 1) / 6, "n = {n}");
        }
    }

    #[test]
    fn zeros_demodulate_to_silence() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        let audio = demod.demodulate(&vec![Complex::new(0.0, 0.0); 8192], 0.8).unwrap();
        assert_eq!(audio.len(), 1365);
        assert!(audio.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn nan_input_degrades_to_silence() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        let mut block = fm_tone(8192, 1000.0, 75_000.0, 288_000.0);
        block[100] = Complex::new(f32::NAN, 0.0);

        assert!(matches!(demod.demodulate(&block, 0.5), Err(FmError::Demodulation(_))));

        let audio = demod.demodulate_or_silence(&block, 0.5);
        assert_eq!(audio.len(), 1365);
        assert!(audio.iter().all(|&s| s == 0.0));

        // The next clean block is unaffected
        let clean = fm_tone(8192, 1000.0, 75_000.0, 288_000.0);
        let audio = demod.demodulate(&clean, 0.5).unwrap();
        assert!(audio.iter().all(|s| s.is_finite()));
        assert!(demod.deemphasis().last_output().is_finite());
    }

    #[test]
    fn peak_normalize_maps_peak_to_volume() {
        let mut block = vec![0.1, -0.4, 0.25, 0.0];
        peak_normalize(&mut block, 0.7);
        let peak = block.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!((peak - 0.7).abs() < 1e-6);
        assert!((block[1] + 0.7).abs() < 1e-6);
    }

    #[test]
    fn peak_normalize_skips_gain_on_near_silence() {
        let mut block = vec![5e-6, -2e-6, 0.0];
        peak_normalize(&mut block, 0.5);
        assert_eq!(block, vec![2.5e-6, -1e-6, 0.0]);
    }

    #[test]
    fn output_never_exceeds_volume() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        let block = fm_tone(8192, 1000.0, 75_000.0, 288_000.0);
        for _ in 0..3 {
            let audio = demod.demodulate(&block, 0.6).unwrap();
            let peak = audio.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
            assert!(peak <= 0.6 + 1e-4, "peak {peak}");
            assert!(peak > 0.3, "peak {peak}");
        }
    }

    #[test]
    fn recovers_modulating_tone() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        let signal = fm_tone(8192 * 4, 1000.0, 75_000.0, 288_000.0);
        let mut audio = Vec::new();
        for block in signal.chunks(8192) {
            audio.extend(demod.demodulate(block, 0.5).unwrap());
        }

        // Skip the filter transient; ~100 ms at 48 kHz remain
        let settled = &audio[500..];
        let crossings = settled
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let seconds = settled.len() as f32 / 48_000.0;
        let tone_hz = crossings as f32 / 2.0 / seconds;
        assert!((tone_hz - 1000.0).abs() < 60.0, "recovered {tone_hz} Hz");
    }

    #[test]
    fn deemphasis_memory_persists_between_blocks() {
        let mut demod = FmDemodulator::new(288_000, 48_000).unwrap();
        let block = fm_tone(8192, 1000.0, 75_000.0, 288_000.0);
        demod.demodulate(&block, 0.5).unwrap();
        assert_ne!(demod.deemphasis().last_output(), 0.0);
        demod.reset();
        assert_eq!(demod.deemphasis().last_output(), 0.0);
    }
}
