//! Station file adapter: implements StationStore as a JSON array
//!
//! File format: `[{"name": "Radio One", "freq": 99.5}, ...]` with `freq` in MHz.
//! Records missing either field are dropped on load and never written.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{FmError, FmResult, Station};
use crate::ports::StationStore;

/// Lenient on-disk record; either field may be absent or null
#[derive(Deserialize)]
struct RawStation {
    name: Option<String>,
    freq: Option<f64>,
}

impl RawStation {
    fn into_station(self) -> Option<Station> {
        let name = self.name?;
        let freq = self.freq?;
        is_valid(&name, freq).then_some(Station { name, freq })
    }
}

fn is_valid(name: &str, freq: f64) -> bool {
    !name.trim().is_empty() && freq.is_finite() && freq > 0.0
}

pub struct JsonStationStore {
    path: PathBuf,
}

impl JsonStationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StationStore for JsonStationStore {
    fn load(&self) -> Vec<Station> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No station file at {}, starting empty", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Failed to read {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        let raw: Vec<RawStation> = match serde_json::from_str(&json) {
            Ok(raw) => raw,
            Err(e) => {
                let err = FmError::Persistence(format!("{}: {e}", self.path.display()));
                log::warn!("{err}; starting with an empty station list");
                return Vec::new();
            }
        };

        let total = raw.len();
        let stations: Vec<Station> = raw.into_iter().filter_map(RawStation::into_station).collect();
        if stations.len() < total {
            log::warn!(
                "Ignored {} incomplete station records in {}",
                total - stations.len(),
                self.path.display()
            );
        }
        log::info!("Loaded {} stations from {}", stations.len(), self.path.display());
        stations
    }

    fn save(&self, stations: &[Station]) -> FmResult<()> {
        let valid: Vec<&Station> = stations
            .iter()
            .filter(|s| is_valid(&s.name, s.freq))
            .collect();
        let json = serde_json::to_string_pretty(&valid)
            .map_err(|e| FmError::Persistence(format!("Serialization error: {e}")))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                FmError::Persistence(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        std::fs::write(&self.path, json).map_err(|e| {
            FmError::Persistence(format!("Failed to write {}: {e}", self.path.display()))
        })?;
        log::debug!("Saved {} stations to {}", valid.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::new(dir.path().join("stations.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonStationStore::new(&path).load().is_empty());
    }

    #[test]
    fn incomplete_records_are_filtered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(
            &path,
            r#"[{"name":"A","freq":88.3},{"name":"B"},{"freq":99.1},{"name":"","freq":90.0},{"name":"C","freq":null}]"#,
        )
        .unwrap();
        let stations = JsonStationStore::new(&path).load();
        assert_eq!(stations, vec![Station { name: "A".into(), freq: 88.3 }]);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::new(dir.path().join("nested").join("stations.json"));
        let stations = vec![
            Station { name: "Jazz".into(), freq: 88.3 },
            Station { name: "Test".into(), freq: 99.5 },
        ];
        store.save(&stations).unwrap();
        assert_eq!(store.load(), stations);

        let json = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[1]["name"], "Test");
        assert_eq!(value[1]["freq"], 99.5);
    }

    #[test]
    fn save_skips_invalid_records() {
        let dir = TempDir::new().unwrap();
        let store = JsonStationStore::new(dir.path().join("stations.json"));
        store
            .save(&[
                Station { name: " ".into(), freq: 95.0 },
                Station { name: "Ok".into(), freq: 96.0 },
            ])
            .unwrap();
        assert_eq!(store.load(), vec![Station { name: "Ok".into(), freq: 96.0 }]);
    }
}
