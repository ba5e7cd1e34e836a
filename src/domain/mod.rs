//! Core domain types
//!
//! Pure types with no I/O dependencies. These represent the core concepts
//! of the FM receiver: tuning, samples, power readings, spectra, stations.

pub mod config;
pub mod error;
pub mod station;
pub mod types;

pub use config::*;
pub use error::*;
pub use station::*;
pub use types::*;
