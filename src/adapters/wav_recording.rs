//! Recording artifact: mono 32-bit float WAV at the audio rate

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::domain::{AudioSample, FmError, FmResult};

/// `recording_YYYYmmdd_HHMMSS.wav` for the current local time
pub fn recording_filename() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("recording_{timestamp}.wav")
}

/// Write `samples` to `path`
pub fn write_wav(path: &Path, samples: &[AudioSample], sample_rate: u32) -> FmResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let file = File::create(path)
        .map_err(|e| FmError::Persistence(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| FmError::Persistence(format!("Failed to create WAV writer: {e}")))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| FmError::Persistence(format!("Failed to write WAV sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| FmError::Persistence(format!("Failed to finalize WAV: {e}")))
}

/// Save a finished recording into `dir` under a timestamped name.
/// Returns `None` without touching the disk when there is nothing to save.
pub fn save_recording(
    dir: &Path,
    samples: &[AudioSample],
    sample_rate: u32,
) -> FmResult<Option<PathBuf>> {
    if samples.is_empty() {
        log::info!("Recording is empty, nothing saved");
        return Ok(None);
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| FmError::Persistence(format!("Failed to create {}: {e}", dir.display())))?;
    let path = dir.join(recording_filename());
    write_wav(&path, samples, sample_rate)?;
    log::info!(
        "Saved {:.1} s recording to {}",
        samples.len() as f64 / f64::from(sample_rate),
        path.display()
    );
    Ok(Some(path))
}
