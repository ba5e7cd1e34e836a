//! Saved stations
//!
//! Stations are unique by name and by frequency (rounded to kHz, i.e. three
//! decimal places in MHz). The list is kept sorted by frequency.

use serde::{Deserialize, Serialize};

use super::error::{FmError, FmResult};

/// A named station. `freq` is in MHz, rounded to 3 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub freq: f64,
}

impl Station {
    pub fn freq_hz(&self) -> f64 {
        self.freq * 1e6
    }
}

/// Round a frequency in Hz to MHz with 3 decimal places
pub fn round_mhz(freq_hz: f64) -> f64 {
    (freq_hz / 1e6 * 1000.0).round() / 1000.0
}

/// Ordered collection of saved stations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationList {
    stations: Vec<Station>,
}

impl StationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded records, dropping later duplicates
    pub fn from_stations(stations: Vec<Station>) -> Self {
        let mut list = Self::new();
        for station in stations {
            let freq_hz = station.freq_hz();
            if let Err(e) = list.add(&station.name, freq_hz) {
                log::warn!("Skipping station '{}': {e}", station.name);
            }
        }
        list
    }

    /// Save a station at `freq_hz`
    pub fn add(&mut self, name: &str, freq_hz: f64) -> FmResult<Station> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FmError::Config("Station name cannot be empty".into()));
        }
        if !freq_hz.is_finite() || freq_hz <= 0.0 {
            return Err(FmError::Config(format!("Invalid station frequency {freq_hz} Hz")));
        }
        let freq = round_mhz(freq_hz);

        if self.stations.iter().any(|s| s.name == name) {
            return Err(FmError::DuplicateStation(format!(
                "a station named '{name}' already exists"
            )));
        }
        if self.stations.iter().any(|s| s.freq == freq) {
            return Err(FmError::DuplicateStation(format!(
                "a station at {freq:.3} MHz already exists"
            )));
        }

        let station = Station {
            name: name.to_string(),
            freq,
        };
        let pos = self.stations.partition_point(|s| s.freq < freq);
        self.stations.insert(pos, station.clone());
        Ok(station)
    }

    /// Remove a station by name, returning it
    pub fn remove(&mut self, name: &str) -> Option<Station> {
        let idx = self.stations.iter().position(|s| s.name == name)?;
        Some(self.stations.remove(idx))
    }

    pub fn find(&self, name: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.name == name)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
