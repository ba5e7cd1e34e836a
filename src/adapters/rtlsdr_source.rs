//! RTL-SDR adapter: implements SampleSource on top of librtlsdr
//!
//! The device itself is compiled only with the `hardware` feature. Without
//! it, `open_rtlsdr` returns a `Hardware` error and the receiver still runs
//! against file or synthetic sources.

#[cfg(not(feature = "hardware"))]
use crate::domain::FmError;
use crate::domain::{FmResult, GainMode};
use crate::ports::SampleSource;

/// Device settings applied on open
#[derive(Debug, Clone, Copy)]
pub struct RtlSdrSettings {
    pub device_index: u32,
    pub sample_rate: u32,
    pub center_freq: f64,
    pub gain: GainMode,
}

/// Manual gain in the tenths of a dB the tuner API expects
pub fn gain_tenths_db(db: f32) -> i32 {
    (db * 10.0).round() as i32
}

#[cfg(feature = "hardware")]
pub use hw::RtlSdrSource;

#[cfg(feature = "hardware")]
mod hw {
    use super::{gain_tenths_db, RtlSdrSettings};
    use crate::adapters::iq_file::samples_from_cu8;
    use crate::domain::{FmError, FmResult, GainMode, SampleBlock};
    use crate::ports::{LazyTuning, SampleSource};

    /// Owns the librtlsdr handle. Not `Send`; open it on the thread that reads.
    pub struct RtlSdrSource {
        device: Option<rtlsdr::RTLSDRDevice>,
        sample_rate: u32,
        tuning: LazyTuning,
    }

    impl RtlSdrSource {
        pub fn open(settings: RtlSdrSettings) -> FmResult<Self> {
            log::info!("Opening RTL-SDR device {}...", settings.device_index);

            let mut device = rtlsdr::open(settings.device_index as i32).map_err(|e| {
                FmError::Hardware(format!(
                    "Failed to open RTL-SDR device {}: {e}",
                    settings.device_index
                ))
            })?;

            device
                .set_sample_rate(settings.sample_rate)
                .map_err(|e| FmError::Hardware(format!("Failed to set sample rate: {e}")))?;
            set_center_freq(&mut device, settings.center_freq)?;
            set_gain(&mut device, settings.gain)?;
            device
                .reset_buffer()
                .map_err(|e| FmError::Hardware(format!("Failed to reset buffer: {e}")))?;

            log::info!(
                "RTL-SDR ready: {:.3} MHz, {} S/s, gain {}",
                settings.center_freq / 1e6,
                settings.sample_rate,
                settings.gain
            );

            Ok(Self {
                device: Some(device),
                sample_rate: settings.sample_rate,
                tuning: LazyTuning::new(settings.center_freq, settings.gain),
            })
        }

        fn device(&mut self) -> FmResult<&mut rtlsdr::RTLSDRDevice> {
            self.device
                .as_mut()
                .ok_or_else(|| FmError::Hardware("RTL-SDR device is closed".into()))
        }
    }

    fn set_center_freq(device: &mut rtlsdr::RTLSDRDevice, freq_hz: f64) -> FmResult<()> {
        if !(0.0..=f64::from(u32::MAX)).contains(&freq_hz) {
            return Err(FmError::Hardware(format!(
                "Center frequency {freq_hz} Hz is out of range for RTL-SDR"
            )));
        }
        device
            .set_center_freq(freq_hz.round() as u32)
            .map_err(|e| FmError::Hardware(format!("Failed to set center frequency: {e}")))
    }

    fn set_gain(device: &mut rtlsdr::RTLSDRDevice, gain: GainMode) -> FmResult<()> {
        match gain {
            GainMode::Auto => device
                .set_tuner_gain_mode(false)
                .map_err(|e| FmError::Hardware(format!("Failed to set gain mode: {e}"))),
            GainMode::Manual(db) => {
                device
                    .set_tuner_gain_mode(true)
                    .map_err(|e| FmError::Hardware(format!("Failed to set gain mode: {e}")))?;
                device
                    .set_tuner_gain(gain_tenths_db(db))
                    .map_err(|e| FmError::Hardware(format!("Failed to set gain: {e}")))
            }
        }
    }

    impl SampleSource for RtlSdrSource {
        fn set_center_freq(&mut self, freq_hz: f64) {
            self.tuning.request_freq(freq_hz);
        }

        fn set_gain(&mut self, gain: GainMode) {
            self.tuning.request_gain(gain);
        }

        fn read_block(&mut self, n: usize) -> FmResult<SampleBlock> {
            if let Some(freq) = self.tuning.pending_freq() {
                set_center_freq(self.device()?, freq)?;
                self.tuning.mark_freq_applied(freq);
            }
            if let Some(gain) = self.tuning.pending_gain() {
                set_gain(self.device()?, gain)?;
                self.tuning.mark_gain_applied(gain);
            }

            let bytes = self
                .device()?
                .read_sync(n * 2)
                .map_err(|e| FmError::Hardware(format!("RTL-SDR read failed: {e}")))?;
            if bytes.len() < n * 2 {
                return Err(FmError::Hardware(format!(
                    "Short read from RTL-SDR: {} of {} bytes",
                    bytes.len(),
                    n * 2
                )));
            }

            Ok(SampleBlock::new(
                samples_from_cu8(&bytes),
                self.sample_rate,
                self.tuning.applied_freq(),
            ))
        }

        fn close(&mut self) -> FmResult<()> {
            if let Some(mut device) = self.device.take() {
                device
                    .close()
                    .map_err(|e| FmError::Hardware(format!("Failed to close RTL-SDR: {e}")))?;
                log::info!("RTL-SDR closed");
            }
            Ok(())
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn center_freq(&self) -> f64 {
            self.tuning.applied_freq()
        }
    }
}

/// Open an RTL-SDR dongle as a boxed `SampleSource`
#[cfg(feature = "hardware")]
pub fn open_rtlsdr(settings: RtlSdrSettings) -> FmResult<Box<dyn SampleSource>> {
    Ok(Box::new(RtlSdrSource::open(settings)?))
}

#[cfg(not(feature = "hardware"))]
pub fn open_rtlsdr(settings: RtlSdrSettings) -> FmResult<Box<dyn SampleSource>> {
    log::warn!("RTL-SDR hardware support not compiled (enable 'hardware' feature)");
    Err(FmError::Hardware(format!(
        "Cannot open RTL-SDR device {}: built without the 'hardware' feature",
        settings.device_index
    )))
}
