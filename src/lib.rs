//! Mixdeck - Multi-track Timeline Playback Engine
//!
//! Mixdeck turns a mutable timeline of trimmed, offset audio clips with
//! per-clip filter automation into:
//! 1. Real-time scheduled audio graphs for interactive playback
//! 2. A deterministic offline mixdown rendered to 16-bit PCM WAV
//!
//! # Architecture
//!
//! - `automation`: keyframe curves with cubic-bezier easing (source time)
//! - `layers`: clips, timeline geometry, drag editing and the project aggregate
//! - `dsp`: effect model, signal path construction, biquad filters, gain, meter
//! - `engine`: audio buffers, decode/encode, the graph executor, the
//!   playback clock and scheduler, and the offline renderer
//! - `state`: persistence schema, migrations, on-disk storage, autosave

pub mod automation;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod layers;
pub mod state;

pub use config::EngineConfig;
pub use error::{MixdeckError, Result};
