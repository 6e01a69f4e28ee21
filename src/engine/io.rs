//! Audio I/O
//!
//! Decodes imported clip bytes into engine-rate buffers and encodes mixdowns
//! as canonical 16-bit PCM WAV.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{MixdeckError, Result};

/// Bit depth of exported mixdowns
pub const EXPORT_BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical RIFF/WAVE header for PCM output
pub const WAV_HEADER_BYTES: usize = 44;

/// Decode encoded audio bytes into a buffer at `target_rate`
///
/// # Errors
/// * `InvalidAudio` - If the bytes are not a readable WAV stream
/// * `UnsupportedFormat` - If the audio has more than 2 channels or an
///   unsupported bit depth
/// * `EmptyAudio` - If the stream holds no frames
pub fn decode_audio(bytes: &[u8], target_rate: u32) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| MixdeckError::InvalidAudio {
        reason: format!("Failed to parse WAV data: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let source_sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    if channels == 0 || channels > 2 {
        return Err(MixdeckError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }
    if source_sample_rate == 0 {
        return Err(MixdeckError::InvalidAudio {
            reason: "WAV header declares a zero sample rate".to_string(),
            source: None,
        });
    }

    let samples_f32 = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples_f32.len() < channels {
        return Err(MixdeckError::EmptyAudio);
    }

    let decoded = AudioBuffer::from_interleaved(&samples_f32, channels, source_sample_rate)?;
    let buffer = if source_sample_rate != target_rate {
        let resampled = resample_channels(&decoded.samples, source_sample_rate, target_rate);
        AudioBuffer::from_channels(resampled, target_rate)?
    } else {
        decoded
    };
    if buffer.is_empty() {
        return Err(MixdeckError::EmptyAudio);
    }

    debug!(
        source_rate = source_sample_rate,
        target_rate,
        channels,
        frames = buffer.len(),
        "decoded audio"
    );
    Ok(buffer)
}

/// Decode an audio file from disk
pub fn import_audio(path: &Path, target_rate: u32) -> Result<AudioBuffer> {
    let bytes = fs::read(path).map_err(|e| MixdeckError::FileNotFound {
        path: path.display().to_string(),
        source: Some(e),
    })?;
    decode_audio(&bytes, target_rate)
}

/// Convert a float sample to 16-bit PCM
///
/// Hard-clamps to [-1, 1]; negative values scale by 32768, positive values
/// by 32767, truncating toward zero.
#[inline]
pub fn quantize_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a buffer as a 16-bit PCM stereo WAV file image
///
/// Mono buffers are written to both channels. The result is exactly
/// `44 + 4 * frames` bytes long.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: ChannelLayout::Stereo.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: EXPORT_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let frames = buffer.len();
    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_BYTES + frames * 4));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for index in 0..frames {
            for channel in 0..2 {
                writer.write_sample(quantize_i16(buffer.frame_sample(channel, index)))?;
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Encode a buffer and write it to `path`
pub fn export_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let bytes = encode_wav(buffer)?;
    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote WAV");
    Ok(())
}

/// Generate a mono sine tone
///
/// Useful for fixtures and for testing the playback pipeline.
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::with_sample_rate(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => None,
        (SampleFormat::Int, 8) => Some(128.0),
        (SampleFormat::Int, 16) => Some(32768.0),
        (SampleFormat::Int, 24) => Some(8388608.0),
        (SampleFormat::Int, 32) => Some(2147483648.0),
        (format, bits) => {
            return Err(MixdeckError::UnsupportedFormat {
                format: format!("{}-bit {:?} audio", bits, format),
            })
        }
    };

    let collected = match scale {
        None => reader.samples::<f32>().collect::<std::result::Result<Vec<f32>, _>>(),
        Some(scale) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v as f64 / scale) as f32))
            .collect::<std::result::Result<Vec<f32>, _>>(),
    };

    collected.map_err(|e| MixdeckError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    })
}

/// Resample audio channels to a different sample rate
fn resample_channels(channels: &[Vec<f32>], source_rate: u32, target_rate: u32) -> Vec<Vec<f32>> {
    let ratio = target_rate as f64 / source_rate as f64;

    channels
        .iter()
        .map(|channel| resample_linear(channel, ratio))
        .collect()
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================
