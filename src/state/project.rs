//! Project State Schema
//!
//! Defines the project.json schema and the conversion between the saved
//! document and the live [`Project`] plus its [`TransportSession`].
//!
//! Loading is lenient: missing fields take their defaults, non-numeric or
//! non-finite numbers become zero, and a layer whose audio cannot be decoded
//! is reported and skipped instead of failing the whole project.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::dsp::{sanitize_gain, Effect};
use crate::engine::io::decode_audio;
use crate::engine::TransportSession;
use crate::error::MixdeckError;
use crate::layers::{ImportFailure, ImportReport, Layer, Project, DEFAULT_PX_PER_SEC};
use crate::state::migration::CURRENT_SCHEMA_VERSION;

/// Project directory structure constants.
pub const PROJECT_FILE: &str = "project.json";
pub const AUDIO_DIR: &str = "audio";

/// Extension of stored clip bytes.
pub const AUDIO_EXTENSION: &str = "bin";

/// The saved project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version for migration support.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// When the document was written.
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,

    /// Linear master gain.
    #[serde(default = "unit", deserialize_with = "number_or_one")]
    pub master_volume_gain: f64,

    /// Resting playhead in seconds.
    #[serde(default, deserialize_with = "number_or_zero")]
    pub playhead_time: f64,

    /// Where the last play session started; the playhead when absent.
    #[serde(default, deserialize_with = "optional_number")]
    pub play_session_start_time: Option<f64>,

    /// View scale in pixels per second.
    #[serde(default = "default_px_per_sec", deserialize_with = "number_or_px_per_sec")]
    pub px_per_sec: f64,

    /// Layers in timeline order.
    #[serde(default, deserialize_with = "lenient_layers")]
    pub layers: Vec<LayerRecord>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, Value>,
}

/// One saved layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Layer id; a fresh one is assigned on load when empty.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub offset: f64,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub trim_start: f64,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub trim_end: f64,

    /// Effects in signal order; entries that do not parse are dropped.
    #[serde(default, deserialize_with = "lenient_effects")]
    pub effects: Vec<Effect>,

    #[serde(default = "unit", deserialize_with = "number_or_one")]
    pub gain_value: f64,

    /// Clip bytes path relative to the project directory.
    #[serde(default)]
    pub audio_file: String,

    /// SHA-256 of the clip bytes, lowercase hex.
    #[serde(default)]
    pub checksum: String,

    /// Encoded clip bytes, stored beside the document.
    #[serde(skip)]
    pub raw_audio: Vec<u8>,
}

impl LayerRecord {
    /// Label used when reporting this record
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

fn unit() -> f64 {
    1.0
}

fn default_px_per_sec() -> f64 {
    DEFAULT_PX_PER_SEC
}

/// Hex SHA-256 of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Relative path of a layer's stored clip bytes.
pub fn audio_file_name(layer_id: &str) -> String {
    format!("{}/{}.{}", AUDIO_DIR, layer_id, AUDIO_EXTENSION)
}

// ============================================================================
// Lenient field parsing
// ============================================================================

/// Numbers as numbers, numeric strings parsed, booleans as 0/1; `None` for
/// null and anything else. Non-finite results count as zero.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    Some(if number.is_finite() { number } else { 0.0 })
}

fn number_or<'de, D>(deserializer: D, fallback: f64) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value).unwrap_or(fallback))
}

fn number_or_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number_or(deserializer, 0.0)
}

fn number_or_one<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number_or(deserializer, 1.0)
}

fn number_or_px_per_sec<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number_or(deserializer, DEFAULT_PX_PER_SEC)
}

fn optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

fn lenient_effects<'de, D>(deserializer: D) -> std::result::Result<Vec<Effect>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Effect>(item) {
            Ok(effect) => Some(effect),
            Err(error) => {
                warn!(%error, "dropping unreadable effect");
                None
            }
        })
        .collect())
}

fn lenient_layers<'de, D>(deserializer: D) -> std::result::Result<Vec<LayerRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LayerRecord>(item) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(%error, "dropping unreadable layer record");
                None
            }
        })
        .collect())
}

// ============================================================================
// Conversion
// ============================================================================

impl ProjectFile {
    /// An empty document at the current schema version.
    pub fn empty() -> Self {
        Self {
            schema_version: default_schema_version(),
            saved_at: Utc::now(),
            master_volume_gain: 1.0,
            playhead_time: 0.0,
            play_session_start_time: Some(0.0),
            px_per_sec: DEFAULT_PX_PER_SEC,
            layers: Vec::new(),
            unknown_fields: HashMap::new(),
        }
    }
}

impl Project {
    /// Snapshot the project and transport for saving.
    pub fn to_file(&self, session: &TransportSession) -> ProjectFile {
        let layers = self
            .layers()
            .iter()
            .map(|layer| LayerRecord {
                id: layer.id.clone(),
                name: layer.name.clone(),
                offset: layer.offset,
                trim_start: layer.trim_start,
                trim_end: layer.trim_end,
                effects: layer.effects.clone(),
                gain_value: layer.gain,
                audio_file: audio_file_name(&layer.id),
                checksum: checksum(layer.raw_audio()),
                raw_audio: layer.raw_audio().to_vec(),
            })
            .collect();

        ProjectFile {
            schema_version: default_schema_version(),
            saved_at: Utc::now(),
            master_volume_gain: self.master_gain,
            playhead_time: session.playhead_time(),
            play_session_start_time: Some(session.play_session_start_time()),
            px_per_sec: self.px_per_sec,
            layers,
            unknown_fields: HashMap::new(),
        }
    }

    /// Rebuild a playable project from a saved document.
    ///
    /// Each layer's clip bytes are decoded again at `sample_rate`. Layers
    /// that fail are listed in the report and left out.
    pub fn from_file(
        file: ProjectFile,
        sample_rate: u32,
    ) -> (Project, TransportSession, ImportReport) {
        let mut project = Project::new(sample_rate);
        project.master_gain = sanitize_gain(file.master_volume_gain, 1.0);
        project.set_zoom(file.px_per_sec);

        let playhead = file.playhead_time;
        let session_start = file.play_session_start_time.unwrap_or(playhead);
        let session = TransportSession::restore(playhead, session_start);

        let mut report = ImportReport::default();
        for record in file.layers {
            let name = record.display_name().to_string();
            let source = match decode_audio(&record.raw_audio, sample_rate) {
                Ok(source) => source,
                Err(error) => {
                    warn!(layer = %name, %error, "layer could not be restored");
                    report.failed.push(ImportFailure { name, error });
                    continue;
                }
            };

            let id = if record.id.trim().is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                record.id
            };
            let mut layer =
                Layer::with_id(id, record.name, Arc::new(source), Arc::from(record.raw_audio));
            layer.offset = record.offset;
            layer.trim_start = record.trim_start;
            layer.trim_end = record.trim_end;
            layer.gain = record.gain_value;
            layer.effects = record.effects;
            layer.ensure_automation_defaults();

            report.imported.push(layer.id.clone());
            project.push_layer(layer);
        }

        info!(
            layers = report.imported.len(),
            failed = report.failed.len(),
            "project restored"
        );
        (project, session, report)
    }
}

/// Failure for a record whose stored bytes do not match its checksum.
pub(crate) fn checksum_failure(record: &LayerRecord) -> ImportFailure {
    ImportFailure {
        name: record.display_name().to_string(),
        error: MixdeckError::ChecksumMismatch {
            path: record.audio_file.clone(),
        },
    }
}
