//! Numerically Controlled Oscillator

use std::f64::consts::PI;

use num_complex::Complex;

/// Complex oscillator whose frequency may change every sample, which makes
/// it an FM modulator when driven by an audio signal.
pub struct Nco {
    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
}

impl Nco {
    /// Create a new NCO with the given frequency and sample rate
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        let phase_increment = 2.0 * PI * frequency / sample_rate;
        Self {
            phase: 0.0,
            phase_increment,
            sample_rate,
        }
    }

    /// Set the oscillator frequency (may be negative)
    pub fn set_frequency(&mut self, frequency: f64) {
        self.phase_increment = 2.0 * PI * frequency / self.sample_rate;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.phase_increment * self.sample_rate / (2.0 * PI)
    }

    /// Generate the next complex sample `e^{jφ}`
    pub fn next_iq(&mut self) -> Complex<f32> {
        let sample = Complex::new(self.phase.cos() as f32, self.phase.sin() as f32);
        self.phase += self.phase_increment;
        self.wrap_phase();
        sample
    }

    /// Reset phase to zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn wrap_phase(&mut self) {
        self.phase = self.phase.rem_euclid(2.0 * PI);
    }
}
