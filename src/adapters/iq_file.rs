//! I/Q capture file adapter: implements SampleSource over a recording
//!
//! Reads the 8-bit unsigned interleaved format written by `rtl_sdr`
//! (I, Q, I, Q, ... centered on 127.5). Retuning only changes the frequency
//! the blocks are tagged with; the capture itself is fixed.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use num_complex::Complex;

use crate::domain::{FmError, FmResult, GainMode, IqSample, SampleBlock};
use crate::ports::{LazyTuning, SampleSource};

/// Convert interleaved unsigned 8-bit I/Q to complex samples in -1.0..=1.0.
/// A trailing odd byte is ignored.
pub fn samples_from_cu8(bytes: &[u8]) -> Vec<IqSample> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            Complex::new(
                (f32::from(pair[0]) - 127.5) / 127.5,
                (f32::from(pair[1]) - 127.5) / 127.5,
            )
        })
        .collect()
}

pub struct IqFileSource {
    reader: BufReader<File>,
    sample_rate: u32,
    tuning: LazyTuning,
    loop_on_eof: bool,
    /// Sleep so blocks arrive no faster than the sample rate
    realtime: bool,
    started: Option<Instant>,
    samples_delivered: u64,
}

impl IqFileSource {
    pub fn open(path: &Path, sample_rate: u32, center_freq: f64) -> FmResult<Self> {
        let file = File::open(path).map_err(|e| {
            FmError::Hardware(format!("Failed to open I/Q file {}: {e}", path.display()))
        })?;
        log::info!("Replaying I/Q capture {} at {sample_rate} S/s", path.display());
        Ok(Self {
            reader: BufReader::new(file),
            sample_rate,
            tuning: LazyTuning::new(center_freq, GainMode::Auto),
            loop_on_eof: false,
            realtime: false,
            started: None,
            samples_delivered: 0,
        })
    }

    /// Restart from the beginning at end of file instead of failing
    pub fn looping(mut self, enabled: bool) -> Self {
        self.loop_on_eof = enabled;
        self
    }

    /// Pace reads to the sample rate, as live hardware would
    pub fn realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    fn fill(&mut self, buf: &mut [u8]) -> FmResult<()> {
        let mut filled = 0;
        let mut rewound = false;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    // Rewinding twice without progress means the file is empty
                    if !self.loop_on_eof || (rewound && filled == 0) {
                        return Err(FmError::Hardware("End of I/Q capture".into()));
                    }
                    self.reader
                        .seek(SeekFrom::Start(0))
                        .map_err(|e| FmError::Hardware(format!("Failed to rewind I/Q file: {e}")))?;
                    rewound = true;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FmError::Hardware(format!("I/Q file read failed: {e}"))),
            }
        }
        Ok(())
    }

    fn pace(&mut self, n: usize) {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.samples_delivered += n as u64;
        if !self.realtime {
            return;
        }
        let due = started
            + Duration::from_secs_f64(self.samples_delivered as f64 / f64::from(self.sample_rate));
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
    }
}

impl SampleSource for IqFileSource {
    fn set_center_freq(&mut self, freq_hz: f64) {
        self.tuning.request_freq(freq_hz);
    }

    fn set_gain(&mut self, gain: GainMode) {
        self.tuning.request_gain(gain);
    }

    fn read_block(&mut self, n: usize) -> FmResult<SampleBlock> {
        if let Some(freq) = self.tuning.pending_freq() {
            self.tuning.mark_freq_applied(freq);
        }
        if let Some(gain) = self.tuning.pending_gain() {
            self.tuning.mark_gain_applied(gain);
        }

        let mut bytes = vec![0u8; n * 2];
        self.fill(&mut bytes)?;
        self.pace(n);

        Ok(SampleBlock::new(
            samples_from_cu8(&bytes),
            self.sample_rate,
            self.tuning.applied_freq(),
        ))
    }

    fn close(&mut self) -> FmResult<()> {
        log::debug!("Closed I/Q capture after {} samples", self.samples_delivered);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn center_freq(&self) -> f64 {
        self.tuning.applied_freq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn capture(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn converts_unsigned_bytes_around_midpoint() {
        let samples = samples_from_cu8(&[255, 0, 127, 128, 7]);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], Complex::new(1.0, -1.0));
        assert!((samples[1].re + 0.5 / 127.5).abs() < 1e-6);
        assert!((samples[1].im - 0.5 / 127.5).abs() < 1e-6);
    }

    #[test]
    fn reads_blocks_tagged_with_tuning() {
        let file = capture(&[128u8; 64]);
        let mut source = IqFileSource::open(file.path(), 288_000, 100e6).unwrap();
        let block = source.read_block(16).unwrap();
        assert_eq!(block.len(), 16);
        assert_eq!(block.center_freq, 100e6);

        source.set_center_freq(99.5e6);
        let block = source.read_block(16).unwrap();
        assert_eq!(block.center_freq, 99.5e6);
        assert_eq!(source.center_freq(), 99.5e6);
    }

    #[test]
    fn end_of_file_is_a_hardware_error() {
        let file = capture(&[128u8; 20]);
        let mut source = IqFileSource::open(file.path(), 288_000, 100e6).unwrap();
        source.read_block(8).unwrap();
        assert!(matches!(source.read_block(8), Err(FmError::Hardware(_))));
    }

    #[test]
    fn looping_wraps_to_start() {
        let bytes: Vec<u8> = (0..8u8).collect();
        let file = capture(&bytes);
        let mut source = IqFileSource::open(file.path(), 288_000, 100e6)
            .unwrap()
            .looping(true);

        let block = source.read_block(6).unwrap();
        let expected = samples_from_cu8(&[0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3]);
        assert_eq!(block.samples, expected);
    }

    #[test]
    fn empty_looping_file_fails_instead_of_spinning() {
        let file = capture(&[]);
        let mut source = IqFileSource::open(file.path(), 288_000, 100e6)
            .unwrap()
            .looping(true);
        assert!(source.read_block(4).is_err());
    }

    #[test]
    fn missing_file_fails_to_open() {
        assert!(matches!(
            IqFileSource::open(Path::new("/nonexistent/capture.cu8"), 288_000, 100e6),
            Err(FmError::Hardware(_))
        ));
    }

    #[test]
    fn realtime_pacing_tracks_sample_rate() {
        let file = capture(&vec![128u8; 4_800]);
        let mut source = IqFileSource::open(file.path(), 48_000, 100e6)
            .unwrap()
            .realtime(true);
        let start = Instant::now();
        // 2 x 1200 samples at 48 kS/s = 50 ms
        source.read_block(1_200).unwrap();
        source.read_block(1_200).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(45));
    }
}
