//! FM broadcast receiver
//!
//! Turns a stream of I/Q samples from an RTL-SDR (or a capture file, or a
//! synthetic band) into mono audio, with a live power meter, spectrum
//! snapshots, a peak-seeking band scanner, saved stations and recording.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for external dependencies
//! - `dsp/` - Signal processing (pure functions and small stateful filters)
//! - `receiver/` - Demodulator, audio queue, recorder, scanner, session threads
//! - `adapters/` - Implementations of ports (rtlsdr, cpal, files)
//! - `state` - Shared receiver state read by the display layer
//! - `console` - Line commands for the headless driver

// Core domain (pure, no I/O)
pub mod domain;
pub mod dsp;
pub mod ports;
pub mod receiver;

// Adapters (external I/O)
pub mod adapters;

pub mod console;
pub mod state;
