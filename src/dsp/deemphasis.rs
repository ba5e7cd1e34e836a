//! FM broadcast de-emphasis
//!
//! One-pole IIR lowpass `y[n] = (1 - x)·in[n] + x·y[n-1]` with
//! `x = exp(-1 / (fs·τ))`. The previous output is kept between calls because
//! audio arrives as a continuous stream cut into blocks; restarting from zero
//! at every block boundary produces an audible click.

/// Broadcast de-emphasis time constant
pub const TAU_75_US: f64 = 75e-6;

#[derive(Debug, Clone)]
pub struct Deemphasis {
    /// Feedback coefficient `x`
    pole: f32,
    /// Feed-forward gain `1 - x`
    gain: f32,
    /// Last output, carried across blocks
    last_output: f32,
}

impl Deemphasis {
    pub fn new(sample_rate: u32, tau_secs: f64) -> Self {
        let pole = (-1.0 / (f64::from(sample_rate) * tau_secs)).exp();
        Self {
            pole: pole as f32,
            gain: (1.0 - pole) as f32,
            last_output: 0.0,
        }
    }

    /// Filter `block` in place
    pub fn process_block(&mut self, block: &mut [f32]) {
        let mut y = self.last_output;
        for sample in block.iter_mut() {
            y = self.gain * *sample + self.pole * y;
            *sample = y;
        }
        self.last_output = y;
    }

    pub fn pole(&self) -> f32 {
        self.pole
    }

    /// Filter memory (the previous output sample)
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.last_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 0.37).sin() * 0.8 + if i % 7 == 0 { 0.3 } else { -0.1 })
            .collect()
    }

    #[test]
    fn coefficient_matches_time_constant() {
        let d = Deemphasis::new(48_000, TAU_75_US);
        let expected = (-1.0f64 / (48_000.0 * 75e-6)).exp() as f32;
        assert!((d.pole() - expected).abs() < 1e-7);
        assert!((d.pole() - 0.7575).abs() < 1e-3);
    }

    #[test]
    fn state_carries_across_blocks() {
        let input = signal(2400);

        let mut one_call = Deemphasis::new(48_000, TAU_75_US);
        let mut whole = input.clone();
        one_call.process_block(&mut whole);

        let mut two_calls = Deemphasis::new(48_000, TAU_75_US);
        let (mut first, mut second) = (input[..1000].to_vec(), input[1000..].to_vec());
        two_calls.process_block(&mut first);
        two_calls.process_block(&mut second);
        first.extend(second);

        assert_eq!(whole, first);
        assert_eq!(one_call.last_output(), two_calls.last_output());
    }

    #[test]
    fn dc_passes_with_unity_gain() {
        let mut d = Deemphasis::new(48_000, TAU_75_US);
        let mut block = vec![0.5; 500];
        d.process_block(&mut block);
        assert!((block[499] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn reset_clears_memory() {
        let mut d = Deemphasis::new(48_000, TAU_75_US);
        d.process_block(&mut [1.0; 10]);
        assert!(d.last_output() > 0.0);
        d.reset();
        assert_eq!(d.last_output(), 0.0);
        let mut block = [0.0; 4];
        d.process_block(&mut block);
        assert_eq!(block, [0.0; 4]);
    }

    #[test]
    fn nyquist_tone_is_attenuated() {
        let mut d = Deemphasis::new(48_000, TAU_75_US);
        let mut block: Vec<f32> = (0..480).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        d.process_block(&mut block);
        let peak = block[100..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(peak < 0.2, "got {peak}");
    }
}
