//! CPAL audio adapter: implements AudioOutput using the cpal crate
//!
//! The playback thread writes blocks into a lock-free ring buffer; the cpal
//! callback drains it on the audio thread and pads with silence on underrun.
//! `write` waits for room in the ring, which paces the playback thread to the
//! sound card.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};

use crate::domain::{AudioSample, FmError, FmResult};
use crate::ports::AudioOutput;

/// Ring capacity in output blocks
const RING_BLOCKS: usize = 4;
/// Poll interval while waiting for room in the ring
const WRITE_POLL: Duration = Duration::from_millis(5);

/// Names of the host's output devices
pub fn list_output_devices() -> FmResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| FmError::AudioDevice(format!("Failed to enumerate devices: {e}")))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

/// Audio output adapter backed by cpal.
///
/// Important: `cpal::Stream` is `!Send`, so this struct must be created and
/// used on the playback thread (see `OutputFactory`).
pub struct CpalAudioOutput {
    device_name: Option<String>,
    stream: Option<Stream>,
    producer: Option<HeapProd<AudioSample>>,
    running: Arc<AtomicBool>,
}

impl CpalAudioOutput {
    /// Play through `device_name`, or the host default when `None`
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
            producer: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn find_device(&self) -> FmResult<cpal::Device> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(wanted) => host
                .output_devices()
                .map_err(|e| FmError::AudioDevice(format!("Failed to enumerate devices: {e}")))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or_else(|| FmError::AudioDevice(format!("Audio device not found: {wanted}"))),
            None => host
                .default_output_device()
                .ok_or_else(|| FmError::AudioDevice("No default output device".into())),
        }
    }
}

impl AudioOutput for CpalAudioOutput {
    fn start(&mut self, sample_rate: u32, block_size: usize) -> FmResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(FmError::AudioDevice("Audio output already running".into()));
        }

        let device = self.find_device()?;
        let channels = device
            .default_output_config()
            .map(|c| c.channels())
            .unwrap_or(1)
            .max(1);

        // Mono samples are duplicated onto every device channel
        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<AudioSample>::new(block_size.max(1) * RING_BLOCKS);
        let (producer, mut consumer) = rb.split();

        let err_running = self.running.clone();
        let frame_len = usize::from(channels);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(frame_len) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                move |err| {
                    log::error!("Audio output stream error: {err}");
                    err_running.store(false, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| FmError::AudioDevice(format!("Failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| FmError::AudioDevice(format!("Failed to start output stream: {e}")))?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Audio output on {name}: {sample_rate} Hz, {channels} ch");

        self.running.store(true, Ordering::SeqCst);
        self.producer = Some(producer);
        self.stream = Some(stream);
        Ok(())
    }

    fn write(&mut self, samples: &[AudioSample]) -> FmResult<()> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| FmError::AudioDevice("Audio output not started".into()))?;

        let mut pending = samples;
        while !pending.is_empty() {
            if !self.running.load(Ordering::SeqCst) {
                return Err(FmError::AudioDevice("Audio output stream stopped".into()));
            }
            if producer.is_full() {
                thread::sleep(WRITE_POLL);
                continue;
            }
            let written = producer.push_slice(pending);
            pending = &pending[written..];
        }
        Ok(())
    }

    fn stop(&mut self) -> FmResult<()> {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the stream stops playback
        self.stream = None;
        self.producer = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_output_is_not_running() {
        let output = CpalAudioOutput::new(None);
        assert!(!output.is_running());
    }

    #[test]
    fn list_devices_does_not_panic() {
        // May be empty or an error in CI
        let _ = list_output_devices();
    }

    #[test]
    fn stop_is_idempotent() {
        let mut output = CpalAudioOutput::new(None);
        assert!(output.stop().is_ok());
        assert!(output.stop().is_ok());
    }

    #[test]
    fn write_before_start_fails() {
        let mut output = CpalAudioOutput::new(None);
        assert!(matches!(output.write(&[0.0; 8]), Err(FmError::AudioDevice(_))));
    }

    #[test]
    fn unknown_device_fails_to_start() {
        let mut output = CpalAudioOutput::new(Some("nonexistent-device-that-does-not-exist".into()));
        assert!(output.start(48_000, 2_400).is_err());
    }
}
