//! Receiver session: owns the acquisition, playback and scan threads
//!
//! Architecture: neither the sample source (librtlsdr handle) nor the audio
//! output (`cpal::Stream`) is `Send`, so `start` takes factories and each
//! device is opened on the thread that will use it. The threads share one
//! `RadioState`; the caller only ever reads snapshots from it.
//!
//! Cancellation is cooperative. Each loop checks the running flag once per
//! iteration, so a stop takes effect within one block read, one playback pull
//! timeout, or one scan tick.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use crate::domain::{
    FmError, FmResult, Frequency, GainMode, PowerReading, RadioConfig, ScanState, SpectrumFrame,
    Station, StationList, TuningState,
};
use crate::dsp::power_dbm;
use crate::ports::{AudioOutput, OutputFactory, SampleSource, SourceFactory};
use crate::state::RadioState;

use super::audio_sink::AudioSink;
use super::demodulator::FmDemodulator;
use super::recorder::Recorder;
use super::scanner::{run_scan_loop, ScanController};
use super::spectrum::{SnapshotThrottle, SpectrumSnapshotter};

/// How long `start` waits for the source to open
const SOURCE_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Playback pull timeout; bounds how long playback takes to notice a stop
const PULL_TIMEOUT: Duration = Duration::from_millis(250);

/// Emit a warning every this many dropped blocks
const DROP_WARN_INTERVAL: u64 = 50;

pub struct Radio {
    config: RadioConfig,
    state: Arc<RadioState>,
    sink: Arc<AudioSink>,
    recorder: Arc<Recorder>,
    acquisition: Option<JoinHandle<()>>,
    playback: Option<JoinHandle<()>>,
    scanner: Option<JoinHandle<()>>,
}

impl Radio {
    pub fn new(config: RadioConfig) -> FmResult<Self> {
        config.validate()?;
        let state = Arc::new(RadioState::new(TuningState {
            center_freq: config.band.clamp(config.initial_freq_hz),
            gain: config.gain,
            volume: config.volume,
        }));
        let sink = Arc::new(AudioSink::new(config.queue_capacity));
        Ok(Self {
            config,
            state,
            sink,
            recorder: Arc::new(Recorder::new()),
            acquisition: None,
            playback: None,
            scanner: None,
        })
    }

    /// Open the source on a new acquisition thread and start playback.
    ///
    /// Returns once the source is open, or with its open error. An open that
    /// outlasts the timeout is abandoned: its thread is detached and closes
    /// the source unused if the open ever completes. A playback failure does
    /// not fail `start`; it ends playback only and is reported through
    /// `take_error`.
    pub fn start(&mut self, source: SourceFactory, output: OutputFactory) -> FmResult<()> {
        if self.state.is_running() {
            return Err(FmError::Hardware("Radio already running".into()));
        }
        // A previous session may have ended on its own (e.g. device error)
        self.join_threads();

        let stale = self.sink.clear();
        if stale > 0 {
            log::debug!("Discarded {stale} stale audio blocks");
        }
        self.state.take_error();

        let demodulator = FmDemodulator::new(self.config.sample_rate, self.config.audio_rate)?;
        let (init_tx, init_rx) = bounded::<FmResult<()>>(1);
        // Released only once `start` accepts the source
        let (go_tx, go_rx) = bounded::<()>(1);

        self.state.set_running(true);
        self.state.set_acquiring(true);

        let acquisition = {
            let state = self.state.clone();
            let sink = self.sink.clone();
            let recorder = self.recorder.clone();
            let config = self.config.clone();
            thread::Builder::new()
                .name("fm-acquisition".into())
                .spawn(move || {
                    let mut source = match source() {
                        Ok(source) => source,
                        Err(e) => {
                            let _ = init_tx.send(Err(e));
                            return;
                        }
                    };
                    if init_tx.send(Ok(())).is_err() || go_rx.recv().is_err() {
                        log::warn!("Sample source opened after start gave up; closing it");
                        if let Err(e) = source.close() {
                            log::warn!("Error closing sample source: {e}");
                        }
                        return;
                    }
                    run_acquisition_loop(state, sink, recorder, source, demodulator, &config);
                })
                .map_err(|e| {
                    self.state.set_running(false);
                    self.state.set_acquiring(false);
                    FmError::Hardware(format!("Failed to spawn acquisition thread: {e}"))
                })?
        };
        self.acquisition = Some(acquisition);

        match init_rx.recv_timeout(SOURCE_OPEN_TIMEOUT) {
            Ok(Ok(())) => {
                let _ = go_tx.send(());
            }
            Ok(Err(e)) => {
                log::error!("Failed to start radio: {e}");
                self.state.set_running(false);
                self.state.set_acquiring(false);
                self.join_threads();
                return Err(e);
            }
            Err(_) => {
                let e = FmError::Hardware(format!(
                    "Sample source did not open within {}s",
                    SOURCE_OPEN_TIMEOUT.as_secs()
                ));
                log::error!("Failed to start radio: {e}");
                self.state.set_running(false);
                self.state.set_acquiring(false);
                // The open call may never return; dropping the handle detaches it
                drop(self.acquisition.take());
                return Err(e);
            }
        }

        let playback = {
            let state = self.state.clone();
            let sink = self.sink.clone();
            let audio_rate = self.config.audio_rate;
            let block_size = self.config.audio_block_size();
            thread::Builder::new()
                .name("fm-playback".into())
                .spawn(move || run_playback_loop(state, sink, output(), audio_rate, block_size))
        };
        match playback {
            Ok(handle) => self.playback = Some(handle),
            Err(e) => {
                let e = FmError::AudioDevice(format!("Failed to spawn playback thread: {e}"));
                log::error!("{e}");
                self.state.report_error(e.to_string());
            }
        }

        let tuning = self.state.tuning();
        log::info!(
            "Radio started at {:.3} MHz ({} S/s, audio {} Hz)",
            tuning.center_freq / 1e6,
            self.config.sample_rate,
            self.config.audio_rate
        );
        Ok(())
    }

    /// Cancel any scan and stop all loops. Blocks until every thread exits
    /// and the source has been closed.
    pub fn stop(&mut self) {
        self.stop_scan();
        self.state.set_running(false);
        self.join_threads();
        log::info!("Radio stopped");
    }

    fn join_threads(&mut self) {
        for (name, handle) in [
            ("scan", self.scanner.take()),
            ("acquisition", self.acquisition.take()),
            ("playback", self.playback.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    log::error!("{name} thread panicked");
                }
            }
        }
    }

    // --- tuning ---

    /// Manual retune, clamped to the band. Cancels an active scan.
    pub fn tune(&self, freq_hz: f64) -> f64 {
        self.stop_scan();
        let freq = self.config.band.clamp(freq_hz);
        self.state.set_center_freq(freq);
        log::debug!("Tuned to {:.3} MHz", freq / 1e6);
        freq
    }

    /// Retune relative to the current frequency
    pub fn step(&self, delta_hz: f64) -> f64 {
        let current = self.state.tuning().center_freq;
        self.tune(current + delta_hz)
    }

    /// Tune from user text in MHz. Invalid text leaves the frequency unchanged.
    pub fn tune_text(&self, text: &str) -> FmResult<f64> {
        let freq = Frequency::parse_mhz(text)?;
        Ok(self.tune(freq.as_hz()))
    }

    pub fn tune_to_station(&self, station: &Station) -> f64 {
        log::info!("Tuning to station {} ({:.3} MHz)", station.name, station.freq);
        self.tune(station.freq_hz())
    }

    /// Save the current frequency under `name`. Cancels an active scan.
    pub fn save_station(&self, stations: &mut StationList, name: &str) -> FmResult<Station> {
        self.stop_scan();
        let station = stations.add(name, self.state.tuning().center_freq)?;
        log::info!("Saved station {} at {:.3} MHz", station.name, station.freq);
        Ok(station)
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.state.update_tuning(|t| t.volume = volume);
    }

    pub fn set_gain(&self, gain: GainMode) {
        self.state.update_tuning(|t| t.gain = gain);
        log::info!("Gain set to {gain}");
    }

    // --- scanning ---

    pub fn start_scan(&mut self) -> FmResult<()> {
        if !self.state.is_running() {
            return Err(FmError::Scan("Start the radio before scanning".into()));
        }
        if self.state.is_scanning() {
            return Err(FmError::Scan("Scan already running".into()));
        }
        // A cancelled scan thread exits within one tick of the flag clearing
        if let Some(handle) = self.scanner.take() {
            let _ = handle.join();
        }

        let controller = ScanController::new(self.config.scan, self.config.band);
        let state = self.state.clone();
        self.state.set_scanning(true);
        let handle = thread::Builder::new()
            .name("fm-scan".into())
            .spawn(move || run_scan_loop(state, controller))
            .map_err(|e| {
                self.state.set_scanning(false);
                FmError::Scan(format!("Failed to spawn scan thread: {e}"))
            })?;
        self.scanner = Some(handle);
        Ok(())
    }

    /// Cancel the scan without waiting for its current tick to finish
    pub fn stop_scan(&self) {
        if self.state.is_scanning() {
            self.state.set_scanning(false);
            self.state.publish_scan_state(ScanState::Idle);
            log::info!("Scan cancelled");
        }
    }

    // --- recording ---

    pub fn start_recording(&self) {
        self.recorder.arm();
        log::info!("Recording started");
    }

    /// Stop recording and return everything captured since `start_recording`
    pub fn stop_recording(&self) -> Vec<f32> {
        let samples = self.recorder.disarm();
        log::info!(
            "Recording stopped ({:.1} s)",
            samples.len() as f64 / f64::from(self.config.audio_rate)
        );
        samples
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_armed()
    }

    // --- pull-only accessors ---

    pub fn latest_power(&self) -> PowerReading {
        self.state.latest_power()
    }

    pub fn latest_spectrum(&self) -> Option<Arc<SpectrumFrame>> {
        self.state.latest_spectrum()
    }

    pub fn tuning(&self) -> TuningState {
        self.state.tuning()
    }

    pub fn scan_state(&self) -> ScanState {
        self.state.scan_state()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.is_scanning()
    }

    /// First fatal error of the session, if any (reported once)
    pub fn take_error(&self) -> Option<String> {
        self.state.take_error()
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.state.dropped_blocks()
    }

    pub fn queue_len(&self) -> usize {
        self.sink.len()
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Shared state handle for a display thread
    pub fn state(&self) -> Arc<RadioState> {
        self.state.clone()
    }
}

impl Drop for Radio {
    fn drop(&mut self) {
        if self.state.run_requested() {
            self.stop();
        }
    }
}

/// Acquisition thread body. Sole owner of the source; closes it after the
/// loop exits so no read can race the close.
fn run_acquisition_loop(
    state: Arc<RadioState>,
    sink: Arc<AudioSink>,
    recorder: Arc<Recorder>,
    mut source: Box<dyn SampleSource>,
    mut demodulator: FmDemodulator,
    config: &RadioConfig,
) {
    let mut snapshotter = SpectrumSnapshotter::new(config.block_size);
    let mut throttle = SnapshotThrottle::new(config.spectrum_interval());

    while state.run_requested() {
        let tuning = state.tuning();
        source.set_center_freq(tuning.center_freq);
        source.set_gain(tuning.gain);

        let block = match source.read_block(config.block_size) {
            Ok(block) => block,
            Err(e) => {
                log::error!("Acquisition stopped: {e}");
                state.report_error(e.to_string());
                break;
            }
        };

        let now = Instant::now();
        state.publish_power(PowerReading::new(power_dbm(&block.samples), now));

        let audio = demodulator.demodulate_or_silence(&block.samples, tuning.volume);
        recorder.append(&audio);

        if state.run_requested() {
            if let Err(FmError::QueueFull) = sink.push(audio) {
                let dropped = state.record_dropped_block();
                log::debug!("Audio queue full, dropped block ({dropped} total)");
                if dropped % DROP_WARN_INTERVAL == 0 {
                    log::warn!("Playback is falling behind: {dropped} audio blocks dropped");
                }
            }
        }

        if throttle.ready(now) {
            state.publish_spectrum(snapshotter.snapshot_block(&block));
        }
    }

    state.set_acquiring(false);
    if let Err(e) = source.close() {
        log::warn!("Error closing sample source: {e}");
    }
    log::debug!("Acquisition thread exited");
}

/// Playback thread body. Drains the queue into the output; once acquisition
/// has ended it plays whatever is left and exits.
fn run_playback_loop(
    state: Arc<RadioState>,
    sink: Arc<AudioSink>,
    mut output: Box<dyn AudioOutput>,
    audio_rate: u32,
    block_size: usize,
) {
    if let Err(e) = output.start(audio_rate, block_size) {
        log::error!("Playback unavailable: {e}");
        state.report_error(e.to_string());
        return;
    }

    while state.run_requested() {
        let Some(block) = sink.pull(PULL_TIMEOUT) else {
            if !state.run_requested() || !state.is_acquiring() {
                break;
            }
            continue;
        };
        if let Err(e) = output.write(&block) {
            log::error!("Playback stopped: {e}");
            state.report_error(e.to_string());
            break;
        }
    }

    if let Err(e) = output.stop() {
        log::warn!("Error stopping audio output: {e}");
    }
    log::debug!("Playback thread exited");
}
