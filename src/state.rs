//! Shared receiver state
//!
//! One `RadioState` is shared (behind an `Arc`) by the acquisition, playback
//! and scan threads and by whoever drives the UI. Each field has a single
//! writer at a time:
//!
//! - `power` and `spectrum`: acquisition loop
//! - `tuning`: manual controls, or the scan loop while a scan is active
//! - `scan`: scan loop
//!
//! Values are published as whole snapshots under a short-lived lock, so a
//! reader never sees a half-updated struct. Readers tolerate values that are
//! one block stale.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{PowerReading, ScanState, SpectrumFrame, TuningState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct RadioState {
    tuning: Mutex<TuningState>,
    power: Mutex<PowerReading>,
    spectrum: Mutex<Option<Arc<SpectrumFrame>>>,
    scan: Mutex<ScanState>,
    /// Session requested to run
    running: AtomicBool,
    /// Acquisition thread alive
    acquiring: AtomicBool,
    scanning: AtomicBool,
    dropped_blocks: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl RadioState {
    pub fn new(tuning: TuningState) -> Self {
        Self {
            tuning: Mutex::new(tuning),
            power: Mutex::new(PowerReading::default()),
            spectrum: Mutex::new(None),
            scan: Mutex::new(ScanState::Idle),
            running: AtomicBool::new(false),
            acquiring: AtomicBool::new(false),
            scanning: AtomicBool::new(false),
            dropped_blocks: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    // --- tuning ---

    pub fn tuning(&self) -> TuningState {
        *lock(&self.tuning)
    }

    pub fn set_center_freq(&self, freq_hz: f64) {
        lock(&self.tuning).center_freq = freq_hz;
    }

    /// Retune on behalf of the scan loop. Refused once the scan has been
    /// cancelled, so a late scan step can never overwrite a manual retune:
    /// cancellation clears `scanning` before the manual write takes the lock.
    pub fn set_center_freq_from_scan(&self, freq_hz: f64) -> bool {
        let mut tuning = lock(&self.tuning);
        if !self.is_scanning() {
            return false;
        }
        tuning.center_freq = freq_hz;
        true
    }

    pub fn update_tuning(&self, f: impl FnOnce(&mut TuningState)) {
        let mut tuning = lock(&self.tuning);
        f(&mut *tuning);
    }

    // --- power & spectrum ---

    pub fn latest_power(&self) -> PowerReading {
        *lock(&self.power)
    }

    pub fn publish_power(&self, reading: PowerReading) {
        *lock(&self.power) = reading;
    }

    pub fn latest_spectrum(&self) -> Option<Arc<SpectrumFrame>> {
        lock(&self.spectrum).clone()
    }

    pub fn publish_spectrum(&self, frame: SpectrumFrame) {
        *lock(&self.spectrum) = Some(Arc::new(frame));
    }

    // --- scanner ---

    pub fn scan_state(&self) -> ScanState {
        if !self.is_scanning() {
            return ScanState::Idle;
        }
        *lock(&self.scan)
    }

    pub fn publish_scan_state(&self, scan: ScanState) {
        *lock(&self.scan) = scan;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn set_scanning(&self, scanning: bool) {
        self.scanning.store(scanning, Ordering::SeqCst);
    }

    // --- lifecycle flags ---

    /// Session requested and acquisition still alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.acquiring.load(Ordering::SeqCst)
    }

    /// Stop requested by the user has not happened yet
    pub fn run_requested(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring.load(Ordering::SeqCst)
    }

    pub fn set_acquiring(&self, acquiring: bool) {
        self.acquiring.store(acquiring, Ordering::SeqCst);
    }

    // --- diagnostics ---

    /// Count one dropped audio block, returning the running total
    pub fn record_dropped_block(&self) -> u64 {
        self.dropped_blocks.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks.load(Ordering::Relaxed)
    }

    /// Keep the first fatal error of a session for the driver to report
    pub fn report_error(&self, message: String) {
        let mut slot = lock(&self.last_error);
        if slot.is_none() {
            *slot = Some(message);
        }
    }

    pub fn take_error(&self) -> Option<String> {
        lock(&self.last_error).take()
    }
}
