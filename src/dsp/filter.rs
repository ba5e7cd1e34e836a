//! FIR filter and decimator

/// FIR filter with a circular delay line
pub struct FirFilter {
    coefficients: Vec<f32>,
    delay_line: Vec<f32>,
    position: usize,
}

impl FirFilter {
    /// Create a new FIR filter with the given coefficients
    pub fn new(coefficients: Vec<f32>) -> Self {
        let len = coefficients.len().max(1);
        Self {
            coefficients,
            delay_line: vec![0.0; len],
            position: 0,
        }
    }

    /// Linear-phase lowpass using a Hann-windowed sinc. `num_taps` should be odd
    /// so the kernel is symmetric about its center tap.
    pub fn lowpass(cutoff_freq: f32, sample_rate: f32, num_taps: usize) -> Self {
        let normalized_cutoff = cutoff_freq / sample_rate;
        let mut coefficients = vec![0.0; num_taps];
        let middle = (num_taps - 1) as f32 / 2.0;
        let span = (num_taps - 1).max(1) as f32;

        for (i, c) in coefficients.iter_mut().enumerate() {
            let n = i as f32 - middle;
            *c = if n == 0.0 {
                2.0 * normalized_cutoff
            } else {
                (2.0 * std::f32::consts::PI * normalized_cutoff * n).sin() / (std::f32::consts::PI * n)
            };

            let window = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / span).cos());
            *c *= window;
        }

        // Unity DC gain
        let sum: f32 = coefficients.iter().sum();
        for c in &mut coefficients {
            *c /= sum;
        }

        Self::new(coefficients)
    }

    /// Shift one sample into the delay line without computing an output
    pub fn push(&mut self, sample: f32) {
        self.delay_line[self.position] = sample;
        self.position = (self.position + 1) % self.delay_line.len();
    }

    /// Filter output for the most recently pushed sample
    pub fn output(&self) -> f32 {
        let len = self.delay_line.len();
        let newest = (self.position + len - 1) % len;

        self.coefficients
            .iter()
            .enumerate()
            .map(|(i, &c)| c * self.delay_line[(newest + len - i) % len])
            .sum()
    }

    /// Process a single sample through the filter
    pub fn process(&mut self, sample: f32) -> f32 {
        self.push(sample);
        self.output()
    }

    /// Reset the filter state
    pub fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.position = 0;
    }
}

/// Anti-alias lowpass followed by integer downsampling.
///
/// Every input sample enters the delay line, but the convolution only runs
/// once per `factor` inputs. History carries across calls while the output
/// phase restarts at each call, so split input matches the unbroken stream
/// only when every block length is a multiple of `factor`.
pub struct FirDecimator {
    filter: FirFilter,
    factor: usize,
}

impl FirDecimator {
    pub fn new(factor: usize, cutoff_freq: f32, input_rate: f32, num_taps: usize) -> Self {
        Self {
            filter: FirFilter::lowpass(cutoff_freq, input_rate, num_taps),
            factor: factor.max(1),
        }
    }

    /// Decimator for `factor`, cutting off at 80% of the output Nyquist
    pub fn for_output_rate(factor: usize, output_rate: u32) -> Self {
        let input_rate = output_rate as f32 * factor as f32;
        let cutoff = 0.8 * output_rate as f32 / 2.0;
        Self::new(factor, cutoff, input_rate, 20 * factor + 1)
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Returns `floor(input.len() / factor)` samples
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let mut output = Vec::with_capacity(input.len() / self.factor);
        let mut chunks = input.chunks_exact(self.factor);
        for chunk in &mut chunks {
            for &sample in chunk {
                self.filter.push(sample);
            }
            output.push(self.filter.output());
        }
        for &sample in chunks.remainder() {
            self.filter.push(sample);
        }
        output
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = FirFilter::lowpass(1000.0, 48000.0, 63);

        // Feed DC (constant 1.0) through the filter; it should converge to ~1.0
        let mut output = 0.0;
        for _ in 0..200 {
            output = filter.process(1.0);
        }

        assert!(
            (output - 1.0).abs() < 0.01,
            "DC signal should pass through lowpass unchanged, got {}",
            output
        );
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let mut filter = FirFilter::lowpass(100.0, 48000.0, 63);

        let freq = 10000.0;
        let mut max_output = 0.0f32;
        for i in 0..1000 {
            let sample = (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin();
            let out = filter.process(sample);
            if i > 100 {
                max_output = max_output.max(out.abs());
            }
        }

        assert!(
            max_output < 0.05,
            "10 kHz signal should be attenuated by lowpass at 100 Hz, got {}",
            max_output
        );
    }

    #[test]
    fn test_lowpass_is_symmetric() {
        let filter = FirFilter::lowpass(19_200.0, 288_000.0, 121);
        let c = &filter.coefficients;
        for i in 0..c.len() / 2 {
            assert!((c[i] - c[c.len() - 1 - i]).abs() < 1e-6, "tap {i} not mirrored");
        }
        let sum: f32 = c.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = FirFilter::lowpass(1000.0, 48000.0, 63);
        for _ in 0..100 {
            filter.process(1.0);
        }

        filter.reset();

        let out = filter.process(0.0);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn decimator_output_length_is_floor() {
        let mut dec = FirDecimator::for_output_rate(6, 48_000);
        assert_eq!(dec.process(&vec![0.0; 8191]).len(), 1365);
        assert_eq!(dec.process(&vec![0.0; 5]).len(), 0);
        assert_eq!(dec.process(&vec![0.0; 12]).len(), 2);
    }

    #[test]
    fn decimator_split_matches_single_call() {
        let input: Vec<f32> = (0..1200).map(|i| ((i as f32) * 0.013).sin()).collect();

        let mut whole = FirDecimator::for_output_rate(6, 48_000);
        let expected = whole.process(&input);

        let mut split = FirDecimator::for_output_rate(6, 48_000);
        let mut got = split.process(&input[..600]);
        got.extend(split.process(&input[600..]));

        assert_eq!(expected, got);
    }

    #[test]
    fn decimator_output_phase_restarts_each_call() {
        let input: Vec<f32> = (0..1200).map(|i| ((i as f32) * 0.013).sin()).collect();

        let mut whole = FirDecimator::for_output_rate(6, 48_000);
        let expected = whole.process(&input);

        // 601 leaves one sample over; it is filtered but produces no output
        let mut split = FirDecimator::for_output_rate(6, 48_000);
        let first = split.process(&input[..601]);
        let second = split.process(&input[601..]);

        assert_eq!(first.len(), 100);
        assert_eq!(second.len(), 599 / 6);
        assert_eq!(first[..], expected[..100]);
        assert_eq!(first.len() + second.len(), expected.len() - 1);
        assert_ne!(second[0], expected[100]);
    }

    #[test]
    fn decimator_rejects_tone_above_output_nyquist() {
        // 40 kHz would alias into the 48 kHz output band
        let fs = 288_000.0;
        let input: Vec<f32> = (0..28_800)
            .map(|i| (2.0 * std::f32::consts::PI * 40_000.0 * i as f32 / fs).sin())
            .collect();
        let mut dec = FirDecimator::for_output_rate(6, 48_000);
        let out = dec.process(&input);
        let peak = out[100..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(peak < 0.05, "aliased tone leaked through: {peak}");
    }
}
