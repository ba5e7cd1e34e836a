//! Digital Signal Processing
//!
//! Pure functions and small stateful filters. No I/O dependencies.

pub mod deemphasis;
pub mod fft;
pub mod filter;
pub mod nco;
pub mod power;

// Re-export commonly used items
pub use deemphasis::Deemphasis;
pub use fft::FftProcessor;
pub use filter::{FirDecimator, FirFilter};
pub use nco::Nco;
pub use power::power_dbm;
