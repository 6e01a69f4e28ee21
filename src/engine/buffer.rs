//! Audio buffers
//!
//! Clip sources and rendered output are planar 32-bit float buffers. Clip
//! sources are decoded once at import and shared read-only between the
//! layer, every scheduled voice and the offline renderer.

use crate::error::{MixdeckError, Result};

/// Native sample rate of the engine (48kHz)
pub const INTERNAL_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Channel Layout
// ============================================================================

/// Channel configurations the engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    Mono,
    /// Left, right. Output is always stereo.
    #[default]
    Stereo,
}

impl ChannelLayout {
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Layout for a decoded channel count; `None` beyond stereo
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }

    fn unsupported(count: usize) -> MixdeckError {
        MixdeckError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", count),
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar audio buffer, one `Vec<f32>` per channel
///
/// # Example
/// ```
/// use mixdeck::engine::buffer::{AudioBuffer, ChannelLayout, INTERNAL_SAMPLE_RATE};
///
/// let buffer = AudioBuffer::new(INTERNAL_SAMPLE_RATE as usize, ChannelLayout::Stereo);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Channel-major sample data
    pub samples: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Silence at the native sample rate
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        Self::with_sample_rate(num_samples, layout, INTERNAL_SAMPLE_RATE)
    }

    /// Silence at `sample_rate`
    pub fn with_sample_rate(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Wrap planar channel data of equal lengths
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if ChannelLayout::from_count(samples.len()).is_none() {
            return Err(ChannelLayout::unsupported(samples.len()));
        }
        let len = samples[0].len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(MixdeckError::InvalidAudio {
                reason: "channels have different lengths".to_string(),
                source: None,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Split frame-interleaved decoder output into channels
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        let layout = ChannelLayout::from_count(channels)
            .ok_or_else(|| ChannelLayout::unsupported(channels))?;
        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); layout.num_channels()];
        for frame in interleaved.chunks_exact(channels) {
            for (channel, &sample) in samples.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Frames per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length in seconds; zero for a zero sample rate
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Sample for output channel `channel`, up-mixing mono to every channel
    ///
    /// Out-of-range frames read as silence.
    #[inline]
    pub fn frame_sample(&self, channel: usize, index: usize) -> f32 {
        let source_channel = channel.min(self.channels().saturating_sub(1));
        self.samples
            .get(source_channel)
            .and_then(|ch| ch.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Largest absolute sample across all channels; 0.0 when empty
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flatten()
            .fold(0.0_f32, |peak, &s| peak.max(s.abs()))
    }
}
