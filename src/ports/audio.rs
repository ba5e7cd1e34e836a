//! Audio output port trait

use crate::domain::{AudioSample, FmResult};

/// Trait for audio output (playback to speaker)
///
/// Note: no `Send` bound. cpal::Stream is !Send, so implementations
/// must live on the thread that created them (the playback thread).
pub trait AudioOutput {
    /// Open a mono f32 stream at `sample_rate` with blocks of `block_size` samples
    fn start(&mut self, sample_rate: u32, block_size: usize) -> FmResult<()>;

    /// Write one block, blocking until the device has room for it
    fn write(&mut self, samples: &[AudioSample]) -> FmResult<()>;

    /// Stop playback and release the device
    fn stop(&mut self) -> FmResult<()>;

    /// Check if currently playing
    fn is_running(&self) -> bool;
}

/// Creates an output on the playback thread
pub type OutputFactory = Box<dyn FnOnce() -> Box<dyn AudioOutput> + Send + 'static>;
