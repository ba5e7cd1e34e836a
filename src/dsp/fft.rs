//! FFT processing for the spectrum display

use std::sync::Arc;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Floor added to magnitudes so empty bins stay finite in dB
const MAGNITUDE_FLOOR: f32 = 1e-10;

/// FFT processor producing a centered magnitude spectrum of I/Q blocks
pub struct FftProcessor {
    planner: FftPlanner<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl FftProcessor {
    /// Create a new FFT processor with the given size
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            planner,
            fft,
            fft_size,
        }
    }

    /// Compute `20*log10(|FFT| + floor)` of the whole block, shifted so bin 0
    /// is the most negative frequency and DC sits at `len / 2`.
    ///
    /// Replans if the block length differs from the current plan.
    pub fn compute(&mut self, samples: &[Complex<f32>]) -> Vec<f32> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }
        if n != self.fft_size {
            self.fft = self.planner.plan_fft_forward(n);
            self.fft_size = n;
        }

        let mut buffer = samples.to_vec();
        self.fft.process(&mut buffer);

        // fftshift: rotate right by n/2
        buffer.rotate_right(n / 2);

        buffer
            .iter()
            .map(|c| 20.0 * (c.norm() + MAGNITUDE_FLOOR).log10())
            .collect()
    }

    /// Get the FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(offset_hz: f32, sample_rate: f32, n: usize) -> Vec<Complex<f32>> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * offset_hz * i as f32 / sample_rate;
                Complex::new(phase.cos(), phase.sin())
            })
            .collect()
    }

    fn peak_bin(spectrum: &[f32]) -> usize {
        spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn dc_lands_in_center_bin() {
        let mut processor = FftProcessor::new(1024);
        let spectrum = processor.compute(&vec![Complex::new(1.0, 0.0); 1024]);
        assert_eq!(spectrum.len(), 1024);
        assert_eq!(peak_bin(&spectrum), 512);
    }

    #[test]
    fn positive_offset_lands_above_center() {
        let mut processor = FftProcessor::new(1024);
        // 36 kHz above center at 288 kS/s is bin 512 + 128
        let spectrum = processor.compute(&tone(36_000.0, 288_000.0, 1024));
        assert_eq!(peak_bin(&spectrum), 640);
    }

    #[test]
    fn negative_offset_lands_below_center() {
        let mut processor = FftProcessor::new(1024);
        let spectrum = processor.compute(&tone(-72_000.0, 288_000.0, 1024));
        assert_eq!(peak_bin(&spectrum), 256);
    }

    #[test]
    fn silence_stays_finite() {
        let mut processor = FftProcessor::new(64);
        let spectrum = processor.compute(&vec![Complex::new(0.0, 0.0); 64]);
        assert!(spectrum.iter().all(|v| v.is_finite()));
        assert!((spectrum[0] - (-200.0)).abs() < 1e-3);
    }

    #[test]
    fn replans_for_new_block_length() {
        let mut processor = FftProcessor::new(64);
        let spectrum = processor.compute(&vec![Complex::new(1.0, 0.0); 128]);
        assert_eq!(spectrum.len(), 128);
        assert_eq!(processor.fft_size(), 128);
    }

    #[test]
    fn compute_repeated_calls_give_identical_results() {
        let mut processor = FftProcessor::new(1024);
        let samples = tone(12_345.0, 288_000.0, 1024);

        let first = processor.compute(&samples);
        let second = processor.compute(&samples);

        assert_eq!(
            first, second,
            "repeated compute() calls must return identical results"
        );
    }
}
