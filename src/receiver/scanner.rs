//! Band scanner
//!
//! `ScanController` is the pure state machine: it owns the sweep cursor and
//! the hill-climbing peak detector, and is driven with explicit power values
//! and timestamps so it can be tested without threads or clocks.
//! `run_scan_loop` drives it against the live shared state.
//!
//! Peak detection only starts tracking a climb once power exceeds the
//! threshold, but any fall while climbing counts as a peak. A slow decay after
//! a sub-threshold bump therefore never pauses the sweep.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::domain::{BandConfig, ScanConfig, ScanState, NO_SIGNAL_DBM};
use crate::state::RadioState;

/// A local power maximum passed while sweeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_hz: f64,
    pub dbm: f32,
}

#[derive(Debug, Clone)]
pub struct ScanController {
    config: ScanConfig,
    band: BandConfig,
    state: ScanState,
    /// Sweep cursor. Stays on the trigger frequency while paused.
    freq: f64,
    last_power: f32,
    is_climbing: bool,
}

impl ScanController {
    pub fn new(config: ScanConfig, band: BandConfig) -> Self {
        Self {
            config,
            band,
            state: ScanState::Idle,
            freq: band.low_hz,
            last_power: NO_SIGNAL_DBM,
            is_climbing: false,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Current sweep cursor
    pub fn frequency(&self) -> f64 {
        self.freq
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Begin sweeping from `current_freq`, or from the lower band edge if it
    /// lies outside the band
    pub fn start(&mut self, current_freq: f64) {
        self.freq = if self.band.contains(current_freq) {
            current_freq
        } else {
            self.band.low_hz
        };
        self.reset_detector();
        self.state = ScanState::Sweeping;
    }

    pub fn stop(&mut self) {
        self.state = ScanState::Idle;
        self.reset_detector();
    }

    /// Step the cursor, wrapping past the upper edge. `None` unless sweeping.
    pub fn advance(&mut self) -> Option<f64> {
        if self.state != ScanState::Sweeping {
            return None;
        }
        self.freq += self.config.step_hz;
        if self.freq > self.band.high_hz {
            self.freq = self.band.low_hz;
        }
        Some(self.freq)
    }

    /// Feed the power measured at the current cursor. Returns the peak when a
    /// local maximum has just been passed; the controller is then paused on it.
    pub fn observe(&mut self, power_dbm: f32, now: Instant) -> Option<Peak> {
        if self.state != ScanState::Sweeping {
            return None;
        }

        if power_dbm > self.last_power && power_dbm > self.config.threshold_dbm {
            self.is_climbing = true;
        }

        let mut peak = None;
        if power_dbm < self.last_power && self.is_climbing {
            let found = Peak {
                freq_hz: self.freq - self.config.step_hz,
                dbm: self.last_power,
            };
            self.state = ScanState::PausedOnPeak {
                since: now,
                peak_freq: found.freq_hz,
            };
            self.is_climbing = false;
            peak = Some(found);
        }

        self.last_power = power_dbm;
        peak
    }

    /// While paused, resume once power drops below the squelch level or the
    /// dwell time has elapsed. Returns true on the transition back to sweeping.
    pub fn check_resume(&mut self, power_dbm: f32, now: Instant) -> bool {
        let ScanState::PausedOnPeak { since, .. } = self.state else {
            return false;
        };
        let squelched = power_dbm < self.config.squelch_dbm();
        let dwelled = now.saturating_duration_since(since) > self.config.dwell();
        if squelched || dwelled {
            self.state = ScanState::Sweeping;
            self.reset_detector();
            return true;
        }
        false
    }

    fn reset_detector(&mut self) {
        self.last_power = NO_SIGNAL_DBM;
        self.is_climbing = false;
    }
}

/// Scan thread body. Runs until the scan is cancelled or the radio stops;
/// each check happens once per tick, so cancellation latency is one settle
/// or pause-poll interval.
pub fn run_scan_loop(state: Arc<RadioState>, mut scanner: ScanController) {
    scanner.start(state.tuning().center_freq);
    state.publish_scan_state(scanner.state());
    log::info!(
        "Scan started at {:.1} MHz (threshold {:.1} dBm)",
        scanner.frequency() / 1e6,
        scanner.config().threshold_dbm
    );

    while state.is_scanning() && state.is_running() {
        match scanner.state() {
            ScanState::Sweeping => {
                let Some(freq) = scanner.advance() else { break };
                if !state.set_center_freq_from_scan(freq) {
                    break;
                }
                thread::sleep(scanner.config().settle());
                if !state.is_scanning() {
                    break;
                }

                let power = state.latest_power().dbm;
                if let Some(peak) = scanner.observe(power, Instant::now()) {
                    log::info!(
                        "Scan: peak at {:.1} MHz ({:.1} dBm), pausing",
                        peak.freq_hz / 1e6,
                        peak.dbm
                    );
                    if !state.set_center_freq_from_scan(peak.freq_hz) {
                        break;
                    }
                }
            }
            ScanState::PausedOnPeak { .. } => {
                let power = state.latest_power().dbm;
                if scanner.check_resume(power, Instant::now()) {
                    log::info!("Scan: resuming sweep (signal {power:.1} dBm)");
                } else {
                    thread::sleep(scanner.config().pause_poll());
                }
            }
            ScanState::Idle => break,
        }
        state.publish_scan_state(scanner.state());
    }

    scanner.stop();
    state.set_scanning(false);
    state.publish_scan_state(ScanState::Idle);
    log::info!("Scan stopped");
}
