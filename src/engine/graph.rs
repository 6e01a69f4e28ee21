//! Voice graph
//!
//! One voice is the audio graph of a single scheduled source: a buffer
//! reader with sample-accurate start, source offset and stop time, the
//! layer's filter chain with automated cutoff, and the layer gain.

use std::fmt;
use std::sync::Arc;

use crate::dsp::{BiquadFilter, FilterStage, SignalPath};
use crate::engine::buffer::AudioBuffer;

/// Handle of a scheduled source on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// A source armed to play part of a buffer at a device time
#[derive(Debug, Clone)]
pub struct ScheduledSource {
    /// Decoded material, shared read-only with the layer
    pub buffer: Arc<AudioBuffer>,
    /// Device time of the first sample
    pub when: f64,
    /// Source time of the first sample
    pub offset: f64,
    /// Seconds to play
    pub duration: f64,
    /// Linear gain applied after the filters
    pub gain: f64,
    /// Filter stages between the reader and the gain
    pub path: SignalPath,
}

/// Runtime state of one scheduled source
#[derive(Debug)]
pub(crate) struct Voice {
    pub(crate) id: SourceId,
    buffer: Arc<AudioBuffer>,
    output_rate: f64,
    start_frame: u64,
    length_frames: u64,
    /// Source position of the first sample, in source frames
    source_start: f64,
    /// Source frames advanced per output frame
    source_step: f64,
    gain: f32,
    filters: Vec<(FilterStage, BiquadFilter)>,
}

impl Voice {
    pub(crate) fn new(id: SourceId, source: ScheduledSource, output_rate: u32) -> Self {
        let output_rate_f = output_rate.max(1) as f64;
        let source_rate = source.buffer.sample_rate.max(1) as f64;
        let when = finite_non_negative(source.when);
        let duration = finite_non_negative(source.duration);
        let channels = source.buffer.channels();

        let filters = source
            .path
            .stages
            .into_iter()
            .map(|stage| {
                let filter =
                    BiquadFilter::new(stage.kind, output_rate, stage.base_freq, stage.q, channels);
                (stage, filter)
            })
            .collect();

        Self {
            id,
            output_rate: output_rate_f,
            start_frame: (when * output_rate_f).round() as u64,
            length_frames: (duration * output_rate_f).round() as u64,
            source_start: finite_non_negative(source.offset) * source_rate,
            source_step: source_rate / output_rate_f,
            gain: source.gain as f32,
            buffer: source.buffer,
            filters,
        }
    }

    /// First output frame after the voice stops
    pub(crate) fn end_frame(&self) -> u64 {
        self.start_frame + self.length_frames
    }

    /// Mix this voice into `out`, whose first frame is `block_start`
    ///
    /// Returns false once the voice has played to its end.
    pub(crate) fn render_add(&mut self, out: &mut AudioBuffer, block_start: u64) -> bool {
        let frames = out.len() as u64;
        let block_end = block_start + frames;
        let end_frame = self.end_frame();

        if block_end <= self.start_frame {
            return true;
        }

        let first = self.start_frame.max(block_start);
        let last = end_frame.min(block_end);
        let source_channels = self.buffer.channels();
        let out_channels = out.channels();
        let mut frame_values = [0.0_f32; 2];

        for abs in first..last {
            let k = (abs - self.start_frame) as f64;
            let t = abs as f64 / self.output_rate;
            let position = self.source_start + k * self.source_step;

            for (ch, value) in frame_values.iter_mut().enumerate().take(source_channels) {
                *value = read_interpolated(&self.buffer, ch, position);
            }

            for (stage, filter) in &mut self.filters {
                filter.set_cutoff(stage.freq_at(t));
                for (ch, value) in frame_values.iter_mut().enumerate().take(source_channels) {
                    *value = filter.process_sample(ch, *value);
                }
            }

            let index = (abs - block_start) as usize;
            for ch in 0..out_channels {
                let source_ch = ch.min(source_channels.saturating_sub(1));
                out.channel_mut(ch)[index] += frame_values[source_ch] * self.gain;
            }
        }

        block_end < end_frame
    }
}

/// Linearly interpolated read; silence past the end of the buffer
#[inline]
fn read_interpolated(buffer: &AudioBuffer, channel: usize, position: f64) -> f32 {
    let data = buffer.channel(channel);
    let index = position.floor() as usize;
    let frac = (position - index as f64) as f32;
    match (data.get(index), data.get(index + 1)) {
        (Some(&a), Some(&b)) => a + (b - a) * frac,
        (Some(&a), None) => a,
        _ => 0.0,
    }
}

#[inline]
fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::ChannelLayout;

    fn ramp(frames: usize, rate: u32) -> Arc<AudioBuffer> {
        let data: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        Arc::new(AudioBuffer::from_channels(vec![data], rate).unwrap())
    }

    fn source(buffer: Arc<AudioBuffer>, when: f64, offset: f64, duration: f64) -> ScheduledSource {
        ScheduledSource {
            buffer,
            when,
            offset,
            duration,
            gain: 1.0,
            path: SignalPath::direct(),
        }
    }

    #[test]
    fn test_voice_start_offset_and_stop_are_sample_accurate() {
        let mut voice = Voice::new(SourceId(1), source(ramp(100, 10), 0.5, 2.0, 1.0), 10);
        let mut out = AudioBuffer::with_sample_rate(20, ChannelLayout::Stereo, 10);
        let alive = voice.render_add(&mut out, 0);
        assert!(!alive);
        // silent before 0.5 s, then source frames 20..30, then silent again
        assert_eq!(out.channel(0)[4], 0.0);
        assert_eq!(out.channel(0)[5], 20.0);
        assert_eq!(out.channel(1)[14], 29.0);
        assert_eq!(out.channel(0)[15], 0.0);
    }

    #[test]
    fn test_voice_spans_blocks() {
        let mut voice = Voice::new(SourceId(1), source(ramp(100, 10), 0.0, 0.0, 1.5), 10);
        let mut first = AudioBuffer::with_sample_rate(10, ChannelLayout::Stereo, 10);
        assert!(voice.render_add(&mut first, 0));
        let mut second = AudioBuffer::with_sample_rate(10, ChannelLayout::Stereo, 10);
        assert!(!voice.render_add(&mut second, 10));
        assert_eq!(second.channel(0)[0], 10.0);
        assert_eq!(second.channel(0)[4], 14.0);
        assert_eq!(second.channel(0)[5], 0.0);
    }

    #[test]
    fn test_voice_reads_silence_past_buffer_end() {
        let mut voice = Voice::new(SourceId(1), source(ramp(5, 10), 0.0, 0.0, 1.0), 10);
        let mut out = AudioBuffer::with_sample_rate(10, ChannelLayout::Stereo, 10);
        voice.render_add(&mut out, 0);
        assert_eq!(out.channel(0)[4], 4.0);
        assert_eq!(out.channel(0)[7], 0.0);
    }

    #[test]
    fn test_voice_resamples_source_rate() {
        // 20 Hz source played on a 10 Hz output skips every other frame
        let mut voice = Voice::new(SourceId(1), source(ramp(40, 20), 0.0, 0.0, 1.0), 10);
        let mut out = AudioBuffer::with_sample_rate(10, ChannelLayout::Stereo, 10);
        voice.render_add(&mut out, 0);
        assert_eq!(out.channel(0)[3], 6.0);
    }

    #[test]
    fn test_gain_is_applied() {
        let mut src = source(ramp(10, 10), 0.0, 0.0, 1.0);
        src.gain = 0.5;
        let mut voice = Voice::new(SourceId(1), src, 10);
        let mut out = AudioBuffer::with_sample_rate(10, ChannelLayout::Stereo, 10);
        voice.render_add(&mut out, 0);
        assert_eq!(out.channel(1)[8], 4.0);
    }
}
