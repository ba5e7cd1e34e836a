//! Adapters
//!
//! Implementations of the port traits: sample sources (RTL-SDR, capture
//! files, a synthetic band), audio outputs (cpal, in-memory), and the station
//! and recording files.

pub mod cpal_audio;
pub mod iq_file;
pub mod json_stations;
pub mod mock_audio;
pub mod rtlsdr_source;
pub mod synthetic;
pub mod wav_recording;

pub use cpal_audio::CpalAudioOutput;
pub use iq_file::IqFileSource;
pub use json_stations::JsonStationStore;
pub use mock_audio::MockAudioOutput;
pub use rtlsdr_source::{open_rtlsdr, RtlSdrSettings};
pub use synthetic::SyntheticSource;
