//! Audio Engine Module
//!
//! Core audio engine including:
//! - Audio buffers, decoding and WAV encoding
//! - The voice graph and mixer shared by playback and mixdown
//! - The audio device seam and a pull-model software device
//! - The transport session, layer scheduler and playback controller
//! - The offline mixdown renderer

pub mod buffer;
pub mod device;
pub mod graph;
pub mod io;
pub mod mixer;
pub mod player;
pub mod render;
pub mod scheduler;
pub mod transport;

pub use buffer::{AudioBuffer, ChannelLayout, INTERNAL_SAMPLE_RATE};
pub use device::{AudioDevice, SoftwareDevice};
pub use graph::{ScheduledSource, SourceId};
pub use io::{decode_audio, encode_wav, export_wav, generate_test_tone, import_audio};
pub use mixer::Mixer;
pub use player::Player;
pub use render::render_mixdown;
pub use scheduler::{arm_layers, plan_layer, scheduled_source, SourcePlan};
pub use transport::{TickStatus, TickToken, TransportListener, TransportSession, TransportState};
