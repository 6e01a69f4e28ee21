//! Project Container
//!
//! The ordered collection of layers plus the master bus and view scale.
//! Imports decode clip bytes here; a failed file never aborts a batch.

use std::sync::Arc;

use tracing::{info, warn};

use super::layer::Layer;
use super::timeline::project_duration;
use super::zoom::clamp_zoom;
use crate::dsp::{sanitize_gain, Effect, EffectKind};
use crate::engine::io::decode_audio;
use crate::error::{MixdeckError, Result};

/// Default view scale in pixels per second
pub const DEFAULT_PX_PER_SEC: f64 = 100.0;

/// A file that could not be imported
#[derive(Debug)]
pub struct ImportFailure {
    /// Name of the offending file
    pub name: String,
    pub error: MixdeckError,
}

/// Outcome of a batch import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids of the layers that were created, in import order
    pub imported: Vec<String>,
    /// Files that failed, each isolated from the rest of the batch
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ImportReport) {
        self.imported.extend(other.imported);
        self.failed.extend(other.failed);
    }
}

/// The project aggregate
#[derive(Debug, Clone)]
pub struct Project {
    layers: Vec<Layer>,
    /// Linear gain of the master bus
    pub master_gain: f64,
    /// View scale, pixels per second
    pub px_per_sec: f64,
    sample_rate: u32,
}

impl Project {
    /// Create an empty project decoding at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            layers: Vec::new(),
            master_gain: 1.0,
            px_per_sec: DEFAULT_PX_PER_SEC,
            sample_rate,
        }
    }

    /// Sample rate clips are decoded to
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// End of the last clip
    pub fn duration(&self) -> f64 {
        project_duration(&self.layers)
    }

    /// Master gain usable as a multiplier
    pub fn effective_master_gain(&self) -> f64 {
        sanitize_gain(self.master_gain, 1.0)
    }

    /// Set the view scale, clamped to the zoom range
    pub fn set_zoom(&mut self, px_per_sec: f64) {
        self.px_per_sec = clamp_zoom(px_per_sec);
    }

    /// Decode `bytes` and append the clip as a new layer
    ///
    /// Returns the new layer's id.
    pub fn import_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<String> {
        let source = decode_audio(&bytes, self.sample_rate)?;
        let layer = Layer::new(name, Arc::new(source), Arc::from(bytes));
        info!(
            layer_id = %layer.id,
            name,
            duration = layer.source_duration(),
            "imported clip"
        );
        let id = layer.id.clone();
        self.layers.push(layer);
        Ok(id)
    }

    /// Import several files; failures are collected, not propagated
    pub fn import_batch<I>(&mut self, files: I) -> ImportReport
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut report = ImportReport::default();
        for (name, bytes) in files {
            match self.import_bytes(&name, bytes) {
                Ok(id) => report.imported.push(id),
                Err(error) => {
                    warn!(name = %name, error = %error, "import failed");
                    report.failed.push(ImportFailure { name, error });
                }
            }
        }
        report
    }

    /// Append an already-built layer
    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Remove a layer by its id
    pub fn remove_layer(&mut self, layer_id: &str) -> Result<Layer> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == layer_id)
            .ok_or_else(|| MixdeckError::LayerNotFound {
                layer_id: layer_id.to_string(),
            })?;
        Ok(self.layers.remove(index))
    }

    /// Remove every layer
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn layer(&self, layer_id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == layer_id)
    }

    pub fn layer_mut(&mut self, layer_id: &str) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or_else(|| MixdeckError::LayerNotFound {
                layer_id: layer_id.to_string(),
            })
    }

    /// Append an effect to a layer; returns the effect id
    pub fn add_effect(&mut self, layer_id: &str, kind: EffectKind) -> Result<String> {
        Ok(self.layer_mut(layer_id)?.add_effect(kind))
    }

    /// Remove an effect from a layer
    pub fn remove_effect(&mut self, layer_id: &str, effect_id: &str) -> Result<Effect> {
        self.layer_mut(layer_id)?.remove_effect(effect_id)
    }

    /// Enable or bypass an effect
    pub fn set_effect_enabled(
        &mut self,
        layer_id: &str,
        effect_id: &str,
        enabled: bool,
    ) -> Result<()> {
        self.layer_mut(layer_id)?.effect_mut(effect_id)?.enabled = enabled;
        Ok(())
    }
}
