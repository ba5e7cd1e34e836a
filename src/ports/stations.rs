//! Station persistence port trait

use crate::domain::{FmResult, Station};

/// Storage for the saved station list
pub trait StationStore {
    /// Load saved stations. Missing or malformed storage yields an empty list.
    fn load(&self) -> Vec<Station>;

    /// Replace the stored list wholesale
    fn save(&self, stations: &[Station]) -> FmResult<()>;
}
