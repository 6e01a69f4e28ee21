//! Schema migration support for Mixdeck projects.
//!
//! Handles upgrading project files from older schema versions to the current
//! version. Migrations are applied sequentially, so a project can be upgraded
//! across several version jumps.
//!
//! Documents without a `schema_version` are the unversioned legacy format
//! with camelCase keys (`masterVol`, `playheadTime`, per-layer `gain`, ...).

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{MixdeckError, Result};

/// Current schema version for project files.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Version assigned to documents that carry no version field.
pub const LEGACY_SCHEMA_VERSION: &str = "0.0.0";

/// Takes a JSON document and returns the migrated document or an error.
type MigrationFn = fn(Value) -> Result<Value>;

/// Maps (from_version, to_version) pairs to migration functions.
fn migration_registry() -> HashMap<(&'static str, &'static str), MigrationFn> {
    let mut registry: HashMap<(&'static str, &'static str), MigrationFn> = HashMap::new();
    registry.insert(
        (LEGACY_SCHEMA_VERSION, "1.0.0"),
        migrate_legacy_to_1_0_0,
    );
    registry
}

/// All known schema versions in order.
fn version_order() -> &'static [&'static str] {
    &[LEGACY_SCHEMA_VERSION, "1.0.0"]
}

/// Schema version of a document, the legacy version when absent.
pub fn document_version(data: &Value) -> String {
    data.get("schema_version")
        .and_then(|v| v.as_str())
        .unwrap_or(LEGACY_SCHEMA_VERSION)
        .to_string()
}

/// Migrate a project document to [`CURRENT_SCHEMA_VERSION`].
///
/// # Errors
/// Returns `MixdeckError::InvalidSchemaVersion` for versions this build does
/// not know, which includes documents written by newer releases.
/// Returns `MixdeckError::MigrationError` if a migration step fails.
pub fn migrate_project(mut data: Value) -> Result<Value> {
    if !data.is_object() {
        return Err(MixdeckError::ProjectError {
            reason: "project document is not a JSON object".to_string(),
        });
    }

    let current_version = document_version(&data);
    let target_version = CURRENT_SCHEMA_VERSION;

    if current_version == target_version {
        return Ok(data);
    }

    if !version_order().contains(&current_version.as_str()) {
        return Err(MixdeckError::InvalidSchemaVersion {
            version: current_version,
        });
    }

    let path = find_migration_path(&current_version, target_version);
    if path.is_empty() {
        return Err(MixdeckError::MigrationError {
            from: current_version,
            to: target_version.to_string(),
            reason: "No migration path found".to_string(),
        });
    }

    let registry = migration_registry();
    for (from, to) in path {
        let migration_fn =
            registry
                .get(&(from, to))
                .ok_or_else(|| MixdeckError::MigrationError {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: "Migration function not found in registry".to_string(),
                })?;

        data = migration_fn(data).map_err(|e| MixdeckError::MigrationError {
            from: from.to_string(),
            to: to.to_string(),
            reason: format!("Migration failed: {}", e),
        })?;

        if let Some(obj) = data.as_object_mut() {
            obj.insert("schema_version".to_string(), Value::String(to.to_string()));
        }
    }

    Ok(data)
}

/// Sequence of registered migrations leading from `from` to `to`.
///
/// Empty when the versions are equal, unknown, or the step would be a
/// downgrade.
pub fn find_migration_path(from: &str, to: &str) -> Vec<(&'static str, &'static str)> {
    let versions = version_order();
    let registry = migration_registry();

    let (from_idx, to_idx) = match (
        versions.iter().position(|&v| v == from),
        versions.iter().position(|&v| v == to),
    ) {
        (Some(f), Some(t)) if f < t => (f, t),
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut current_idx = from_idx;
    while current_idx < to_idx {
        let current = versions[current_idx];
        let next = ((current_idx + 1)..=to_idx)
            .find(|&idx| registry.contains_key(&(current, versions[idx])));
        match next {
            Some(idx) => {
                path.push((current, versions[idx]));
                current_idx = idx;
            }
            None => return Vec::new(),
        }
    }
    path
}

/// Move `old` to `new` unless `new` is already present.
fn rename_key(obj: &mut Map<String, Value>, old: &str, new: &str) {
    if let Some(value) = obj.remove(old) {
        obj.entry(new.to_string()).or_insert(value);
    }
}

/// Legacy camelCase document to 1.0.0.
///
/// Inline clip bytes of the legacy format are not carried over; such layers
/// have no `audio_file` and are reported when the project is opened.
fn migrate_legacy_to_1_0_0(mut data: Value) -> Result<Value> {
    let obj = data.as_object_mut().ok_or_else(|| MixdeckError::ProjectError {
        reason: "project document is not a JSON object".to_string(),
    })?;

    rename_key(obj, "masterVol", "master_volume_gain");
    rename_key(obj, "pxPerSec", "px_per_sec");
    rename_key(obj, "playheadTime", "playhead_time");
    rename_key(obj, "playSessionStartTime", "play_session_start_time");

    if let Some(Value::Array(layers)) = obj.get_mut("layers") {
        for layer in layers.iter_mut() {
            if let Some(layer) = layer.as_object_mut() {
                rename_key(layer, "gain", "gain_value");
                rename_key(layer, "trimStart", "trim_start");
                rename_key(layer, "trimEnd", "trim_end");
                rename_key(layer, "audioFile", "audio_file");
                layer.remove("audio");
            }
        }
    }

    Ok(data)
}
