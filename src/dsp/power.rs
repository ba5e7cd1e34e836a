//! Block power estimate

use num_complex::Complex;

/// Floor added before the logarithm so silence stays finite
const POWER_FLOOR: f64 = 1e-10;

/// Empirical offset matching the dongle's reference level
const DBM_OFFSET: f64 = 30.0;

/// `10*log10(mean(|s|^2) + floor) - 30`. An empty block reads as zero power.
pub fn power_dbm(samples: &[Complex<f32>]) -> f32 {
    let mean = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| f64::from(s.norm_sqr())).sum::<f64>() / samples.len() as f64
    };
    (10.0 * (mean + POWER_FLOOR).log10() - DBM_OFFSET) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_amplitude_reads_minus_30() {
        let samples = vec![Complex::new(0.0f32, 1.0); 256];
        assert!((power_dbm(&samples) - (-30.0)).abs() < 1e-3);
    }

    #[test]
    fn empty_block_reads_as_floor() {
        assert!((power_dbm(&[]) - (-130.0)).abs() < 1e-3);
    }

    #[test]
    fn zeros_read_as_floor() {
        let samples = vec![Complex::new(0.0f32, 0.0); 64];
        assert!((power_dbm(&samples) - (-130.0)).abs() < 1e-3);
    }

    #[test]
    fn ten_x_amplitude_is_twenty_db() {
        let weak = vec![Complex::new(0.01f32, 0.0); 128];
        let strong = vec![Complex::new(0.1f32, 0.0); 128];
        let delta = power_dbm(&strong) - power_dbm(&weak);
        assert!((delta - 20.0).abs() < 1e-3, "got {delta}");
    }
}
