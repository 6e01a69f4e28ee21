//! Audio device
//!
//! The device owns the audio clock and executes scheduled sources on its
//! own once armed. [`SoftwareDevice`] is a pull-model implementation: the
//! clock advances exactly as far as audio has been rendered, so a host audio
//! callback (or a test) drives it by asking for blocks.

use tracing::debug;

use super::buffer::{AudioBuffer, ChannelLayout};
use super::graph::{ScheduledSource, SourceId};
use super::mixer::Mixer;
use crate::error::Result;

/// The real-time audio engine seam
pub trait AudioDevice {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Device clock in seconds
    fn current_time(&self) -> f64;

    /// Start the clock if it is suspended
    fn resume(&mut self) -> Result<()>;

    /// Whether the clock is advancing
    fn is_running(&self) -> bool;

    /// Set the master bus gain (linear)
    fn set_master_gain(&mut self, gain: f64);

    /// Arm a source; it plays without further calls
    fn start_source(&mut self, source: ScheduledSource) -> Result<SourceId>;

    /// Stop a source immediately
    ///
    /// Stopping a source that has already finished is an error the caller
    /// may ignore.
    fn stop_source(&mut self, id: SourceId) -> Result<()>;

    /// Peak of the most recently produced output block
    fn output_peak(&self) -> f32;
}

/// Pull-model software device
#[derive(Debug)]
pub struct SoftwareDevice {
    mixer: Mixer,
    frames_rendered: u64,
    running: bool,
    last_peak: f32,
}

impl SoftwareDevice {
    /// Create a suspended device
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mixer: Mixer::new(sample_rate.max(1)),
            frames_rendered: 0,
            running: false,
            last_peak: 0.0,
        }
    }

    /// Stop the clock; armed sources stay armed
    pub fn suspend(&mut self) {
        self.running = false;
    }

    /// Sources that have not finished yet
    pub fn active_sources(&self) -> usize {
        self.mixer.active_voices()
    }

    /// Produce the next `frames` stereo frames
    ///
    /// A suspended device returns silence and its clock does not move.
    pub fn render(&mut self, frames: usize) -> AudioBuffer {
        if !self.running {
            self.last_peak = 0.0;
            return AudioBuffer::with_sample_rate(
                frames,
                ChannelLayout::Stereo,
                self.mixer.sample_rate(),
            );
        }
        let block = self.mixer.render_block(self.frames_rendered, frames);
        self.frames_rendered += frames as u64;
        self.last_peak = block.peak();
        block
    }

    /// Render `secs` seconds of output, rounded up to whole frames
    pub fn advance(&mut self, secs: f64) -> AudioBuffer {
        let frames = if secs.is_finite() && secs > 0.0 {
            (secs * self.mixer.sample_rate() as f64).ceil() as usize
        } else {
            0
        };
        self.render(frames)
    }
}

impl AudioDevice for SoftwareDevice {
    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.mixer.sample_rate() as f64
    }

    fn resume(&mut self) -> Result<()> {
        if !self.running {
            debug!(time = self.current_time(), "device resumed");
            self.running = true;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_master_gain(&mut self, gain: f64) {
        self.mixer.set_master_gain(gain);
    }

    fn start_source(&mut self, source: ScheduledSource) -> Result<SourceId> {
        Ok(self.mixer.add(source))
    }

    fn stop_source(&mut self, id: SourceId) -> Result<()> {
        self.mixer.stop(id)
    }

    fn output_peak(&self) -> f32 {
        self.last_peak
    }
}
