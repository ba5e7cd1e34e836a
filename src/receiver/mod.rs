//! Receiver core
//!
//! The real-time chain between a sample source and an audio output:
//! demodulation, spectrum snapshots, the audio queue, recording, the band
//! scanner, and the session that runs them on their own threads.

pub mod audio_sink;
pub mod demodulator;
pub mod recorder;
pub mod scanner;
pub mod session;
pub mod spectrum;

pub use audio_sink::AudioSink;
pub use demodulator::FmDemodulator;
pub use recorder::Recorder;
pub use scanner::{Peak, ScanController};
pub use session::Radio;
pub use spectrum::{SnapshotThrottle, SpectrumSnapshotter};
