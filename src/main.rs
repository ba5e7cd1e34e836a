use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use fmscan_lib::adapters::wav_recording::save_recording;
use fmscan_lib::adapters::{
    cpal_audio, open_rtlsdr, CpalAudioOutput, IqFileSource, JsonStationStore, MockAudioOutput,
    RtlSdrSettings, SyntheticSource,
};
use fmscan_lib::console::{Command, HELP};
use fmscan_lib::domain::{
    FmError, FmResult, Frequency, GainMode, RadioConfig, ScanState, StationList,
};
use fmscan_lib::ports::{AudioOutput, OutputFactory, SampleSource, SourceFactory, StationStore};
use fmscan_lib::receiver::Radio;
use fmscan_lib::state::RadioState;

/// Display refresh period
const DISPLAY_TICK: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "fmscan")]
#[command(about = "FM broadcast receiver with band scanner for RTL-SDR")]
struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long, default_value = "fmscan.json")]
    config: PathBuf,

    /// Initial frequency in MHz
    #[arg(short = 'f', long)]
    freq: Option<String>,

    /// Tuner gain: "auto" or dB
    #[arg(short = 'g', long)]
    gain: Option<GainMode>,

    /// Volume, 0.0 to 1.0
    #[arg(short = 'v', long)]
    volume: Option<f32>,

    /// I/Q sample rate in Hz (integer multiple of the audio rate)
    #[arg(short = 's', long)]
    sample_rate: Option<u32>,

    /// RTL-SDR device index
    #[arg(short = 'd', long)]
    device_index: Option<u32>,

    /// Replay an 8-bit unsigned I/Q capture instead of live hardware
    #[arg(long, conflicts_with = "synthetic")]
    iq_file: Option<PathBuf>,

    /// Loop the I/Q capture at end of file
    #[arg(long, requires = "iq_file")]
    loop_file: bool,

    /// Use a built-in synthetic FM band instead of hardware
    #[arg(long)]
    synthetic: bool,

    /// Output device name (default: system default)
    #[arg(long)]
    audio_device: Option<String>,

    /// Discard audio instead of playing it
    #[arg(long)]
    no_audio: bool,

    /// List audio output devices and exit
    #[arg(long)]
    list_audio_devices: bool,

    /// Start scanning the band immediately
    #[arg(long)]
    scan: bool,

    /// Start recording immediately
    #[arg(long)]
    record: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> FmResult<RadioConfig> {
    let mut config = RadioConfig::load(&cli.config)?;
    if let Some(text) = &cli.freq {
        config.initial_freq_hz = Frequency::parse_mhz(text)?.as_hz();
    }
    if let Some(gain) = cli.gain {
        config.gain = gain;
    }
    if let Some(volume) = cli.volume {
        config.volume = volume;
    }
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(index) = cli.device_index {
        config.device_index = index;
    }
    config.validate()?;
    Ok(config)
}

fn source_factory(cli: &Cli, config: &RadioConfig, center_freq: f64) -> SourceFactory {
    let sample_rate = config.sample_rate;
    if let Some(path) = cli.iq_file.clone() {
        let looping = cli.loop_file;
        return Box::new(move || {
            let source = IqFileSource::open(&path, sample_rate, center_freq)?
                .looping(looping)
                .realtime(true);
            Ok(Box::new(source) as Box<dyn SampleSource>)
        });
    }
    if cli.synthetic {
        return Box::new(move || {
            Ok(Box::new(SyntheticSource::demo_band(sample_rate, center_freq)) as Box<dyn SampleSource>)
        });
    }
    let settings = RtlSdrSettings {
        device_index: config.device_index,
        sample_rate,
        center_freq,
        gain: config.gain,
    };
    Box::new(move || open_rtlsdr(settings))
}

fn output_factory(cli: &Cli) -> OutputFactory {
    if cli.no_audio {
        return Box::new(|| Box::new(MockAudioOutput::discarding()) as Box<dyn AudioOutput>);
    }
    let device = cli.audio_device.clone();
    Box::new(move || Box::new(CpalAudioOutput::new(device)) as Box<dyn AudioOutput>)
}

fn status_line(state: &RadioState, recording: bool) -> String {
    let tuning = state.tuning();
    let power = state.latest_power();
    let scan = match state.scan_state() {
        ScanState::Idle => String::new(),
        ScanState::Sweeping => "  [scanning]".to_string(),
        ScanState::PausedOnPeak { peak_freq, .. } => {
            format!("  [paused on {:.1} MHz]", peak_freq / 1e6)
        }
    };
    let peak = state
        .latest_spectrum()
        .and_then(|frame| {
            frame
                .magnitudes_db
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, db)| format!("  peak {:.3} MHz {db:.0} dB", frame.bin_frequency(i) / 1e6))
        })
        .unwrap_or_default();
    format!(
        "{:7.3} MHz  S{} {:6.1} dBm  vol {:.2}  gain {}{scan}{peak}{}",
        tuning.center_freq / 1e6,
        power.s_units(),
        power.dbm,
        tuning.volume,
        tuning.gain,
        if recording { "  REC" } else { "" }
    )
}

/// Periodic display task. Prints a status line when the frequency, scan state
/// or S-meter changes, and reports once if acquisition ends on its own.
fn spawn_display(state: Arc<RadioState>, quit: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_key = None;
        let mut reported_stop = false;
        while !quit.load(Ordering::SeqCst) {
            let tuning = state.tuning();
            let key = (
                (tuning.center_freq / 1e3).round() as i64,
                state.latest_power().s_units(),
                std::mem::discriminant(&state.scan_state()),
            );
            if last_key != Some(key) {
                eprintln!("{}", status_line(&state, false));
                last_key = Some(key);
            }
            if !reported_stop && state.run_requested() && !state.is_acquiring() {
                eprintln!("receiver stopped; type 'quit' to exit");
                reported_stop = true;
            }
            thread::sleep(DISPLAY_TICK);
        }
    })
}

fn run(cli: Cli) -> FmResult<()> {
    if cli.list_audio_devices {
        for name in cpal_audio::list_output_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let store = JsonStationStore::new(&config.stations_file);
    let mut stations = StationList::from_stations(store.load());

    let mut radio = Radio::new(config.clone())?;
    let source = source_factory(&cli, &config, radio.tuning().center_freq);
    radio.start(source, output_factory(&cli))?;

    if cli.record {
        radio.start_recording();
    }
    if cli.scan {
        radio.start_scan()?;
    }

    let quit = Arc::new(AtomicBool::new(false));
    let display = spawn_display(radio.state(), quit.clone());

    eprintln!("type 'help' for commands");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| FmError::Config(format!("Failed to read stdin: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match handle(command, &mut radio, &mut stations, &store) {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => eprintln!("{e}"),
        }
        if !radio.is_running() {
            if let Some(e) = radio.take_error() {
                eprintln!("error: {e}");
            }
        }
    }

    quit.store(true, Ordering::SeqCst);
    if radio.is_recording() {
        finish_recording(&radio);
    }
    radio.stop();
    let _ = display.join();
    if let Some(e) = radio.take_error() {
        eprintln!("error: {e}");
    }
    Ok(())
}

fn finish_recording(radio: &Radio) {
    let samples = radio.stop_recording();
    match save_recording(&radio.config().recordings_dir, &samples, radio.config().audio_rate) {
        Ok(Some(path)) => eprintln!("saved {}", path.display()),
        Ok(None) => eprintln!("recording was empty"),
        Err(e) => log::error!("{e}"),
    }
}

fn persist(store: &JsonStationStore, stations: &StationList) {
    // Write failures are logged, the in-memory list stays authoritative
    if let Err(e) = store.save(stations.stations()) {
        log::error!("{e}");
    }
}

/// Apply one command. Returns true when the user asked to quit.
fn handle(
    command: Command,
    radio: &mut Radio,
    stations: &mut StationList,
    store: &JsonStationStore,
) -> FmResult<bool> {
    match command {
        Command::Tune(text) => {
            let freq = radio.tune_text(&text)?;
            eprintln!("tuned to {:.3} MHz", freq / 1e6);
        }
        Command::Step { delta_hz } => {
            let freq = radio.step(delta_hz);
            eprintln!("tuned to {:.3} MHz", freq / 1e6);
        }
        Command::Scan => radio.start_scan()?,
        Command::StopScan => radio.stop_scan(),
        Command::Save(name) => {
            let station = radio.save_station(stations, &name)?;
            persist(store, stations);
            eprintln!("saved {} at {:.3} MHz", station.name, station.freq);
        }
        Command::Station(name) => {
            let station = stations
                .find(&name)
                .cloned()
                .ok_or_else(|| FmError::Config(format!("No station named '{name}'")))?;
            radio.tune_to_station(&station);
        }
        Command::Delete(name) => {
            stations
                .remove(&name)
                .ok_or_else(|| FmError::Config(format!("No station named '{name}'")))?;
            persist(store, stations);
        }
        Command::List => {
            if stations.is_empty() {
                eprintln!("no saved stations");
            }
            for station in stations.stations() {
                eprintln!("{:8.3} MHz  {}", station.freq, station.name);
            }
        }
        Command::Volume(volume) => radio.set_volume(volume),
        Command::Gain(gain) => radio.set_gain(gain),
        Command::ToggleRecording => {
            if radio.is_recording() {
                finish_recording(radio);
            } else {
                radio.start_recording();
            }
        }
        Command::Status => eprintln!("{}", status_line(&radio.state(), radio.is_recording())),
        Command::Help => eprintln!("{HELP}"),
        Command::Quit => return Ok(true),
    }
    Ok(false)
}
