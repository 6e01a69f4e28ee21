//! Graph executor
//!
//! Sums every armed voice into a stereo bus and applies the master gain.
//! The software device pulls blocks from it in real time; the offline
//! renderer pulls the whole timeline in one pass.

use tracing::trace;

use super::buffer::{AudioBuffer, ChannelLayout};
use super::graph::{ScheduledSource, SourceId, Voice};
use crate::error::{MixdeckError, Result};

/// Voices plus master bus
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
    next_id: u64,
    master_gain: f64,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
            next_id: 1,
            master_gain: 1.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.master_gain = gain;
    }

    /// Number of voices that have not finished
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Output frame after which every voice is silent
    pub fn end_frame(&self) -> u64 {
        self.voices.iter().map(|v| v.end_frame()).max().unwrap_or(0)
    }

    /// Arm a source
    pub fn add(&mut self, source: ScheduledSource) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        trace!(%id, when = source.when, offset = source.offset, duration = source.duration, "voice armed");
        self.voices.push(Voice::new(id, source, self.sample_rate));
        id
    }

    /// Stop a source immediately
    ///
    /// Fails with `SourceNotFound` when the source already finished or was
    /// never armed.
    pub fn stop(&mut self, id: SourceId) -> Result<()> {
        let index = self
            .voices
            .iter()
            .position(|v| v.id == id)
            .ok_or(MixdeckError::SourceNotFound { source_id: id.0 })?;
        self.voices.remove(index);
        Ok(())
    }

    /// Stop every source
    pub fn stop_all(&mut self) {
        self.voices.clear();
    }

    /// Render `frames` stereo frames starting at output frame `start_frame`
    pub fn render_block(&mut self, start_frame: u64, frames: usize) -> AudioBuffer {
        let mut out =
            AudioBuffer::with_sample_rate(frames, ChannelLayout::Stereo, self.sample_rate);

        self.voices
            .retain_mut(|voice| voice.render_add(&mut out, start_frame));

        let master = self.master_gain as f32;
        if master != 1.0 {
            for channel in out.samples.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample *= master;
                }
            }
        }
        out
    }
}
