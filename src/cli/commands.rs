//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command. Every command opens the
//! project from disk, applies its change and saves it back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::automation::Keyframe;
use crate::config::EngineConfig;
use crate::dsp::{format_db, gain_to_db, sanitize_gain, EffectKind, PARAM_FREQ};
use crate::engine::{export_wav, render_mixdown, TransportSession};
use crate::error::MixdeckError;
use crate::layers::{ImportFailure, ImportReport, Project};
use crate::state::ProjectStore;

/// Extension of files picked up when importing a directory.
const IMPORT_EXTENSION: &str = "wav";

/// Create a new project directory.
pub fn create(path: &Path) -> Result<()> {
    info!("Creating new project at: {}", path.display());

    ProjectStore::new(path)
        .create()
        .with_context(|| format!("failed to create project at {}", path.display()))?;

    println!("Project created: {}", path.display());
    Ok(())
}

/// Import files and directories as new layers.
pub fn import(path: &Path, inputs: &[PathBuf], config: &EngineConfig) -> Result<()> {
    let (store, mut project, session) = open(path, config.sample_rate)?;

    let files = collect_audio_files(inputs);
    if files.is_empty() {
        bail!("no audio files found in the given inputs");
    }

    let mut report = ImportReport::default();
    let mut readable = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        match fs::read(&file) {
            Ok(bytes) => readable.push((name, bytes)),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "cannot read input");
                report.failed.push(ImportFailure {
                    name,
                    error: MixdeckError::FileNotFound {
                        path: file.display().to_string(),
                        source: Some(e),
                    },
                });
            }
        }
    }
    report.merge(project.import_batch(readable));

    store
        .save_project(&project, &session)
        .with_context(|| format!("failed to save project at {}", path.display()))?;

    for id in &report.imported {
        if let Some(layer) = project.layer(id) {
            println!(
                "Imported {} ({:.3}s) as {}",
                layer.name,
                layer.source_duration(),
                layer.id
            );
        }
    }
    for failure in &report.failed {
        println!("Failed {}: {}", failure.name, failure.error);
    }
    println!(
        "{} imported, {} failed",
        report.imported.len(),
        report.failed.len()
    );
    Ok(())
}

/// Print the project state.
pub fn info(path: &Path, config: &EngineConfig) -> Result<()> {
    let (_, project, session) = open(path, config.sample_rate)?;

    println!("Project: {}", path.display());
    println!("Layers: {}", project.layers().len());
    println!("Duration: {:.3}s", project.duration());
    println!(
        "Master: {} dB",
        format_db(gain_to_db(project.effective_master_gain()))
    );
    println!(
        "Playhead: {:.3}s (session start {:.3}s)",
        session.playhead_time(),
        session.play_session_start_time()
    );
    println!("{:-<60}", "");

    for layer in project.layers() {
        println!("{} {}", layer.id, layer.name);
        println!(
            "    clip {:.3}s - {:.3}s  trim {:.3}/{:.3}  gain {} dB",
            layer.clip_start(),
            layer.clip_end(),
            layer.trim_start,
            layer.trim_end,
            format_db(gain_to_db(layer.effective_gain()))
        );
        for effect in &layer.effects {
            let keys = effect.freq_curve().map_or(0, |c| c.len());
            println!(
                "    [{}] {} {} {:.0} Hz q {:.2} ({} keys)",
                if effect.enabled { "on" } else { "off" },
                effect.id,
                effect.kind.label(),
                effect.base_freq(),
                effect.q(),
                keys
            );
        }
    }
    Ok(())
}

/// Render the timeline to a WAV file.
pub fn render(
    path: &Path,
    output: &Path,
    sample_rate: Option<u32>,
    config: &EngineConfig,
) -> Result<()> {
    let sample_rate = sample_rate.unwrap_or(config.sample_rate);
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    let (_, project, _) = open(path, sample_rate)?;

    let mix = match render_mixdown(
        project.layers(),
        project.effective_master_gain(),
        sample_rate,
        &config.automation,
    ) {
        Some(mix) => mix,
        None => bail!("nothing to render, the project is empty"),
    };

    export_wav(&mix, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Rendered {:.3}s at {} Hz to {} (peak {} dB)",
        mix.duration_secs(),
        sample_rate,
        output.display(),
        format_db(gain_to_db(mix.peak() as f64))
    );
    Ok(())
}

/// Move, trim or set the gain of a layer.
pub fn place(
    path: &Path,
    layer_id: &str,
    offset: Option<f64>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
    gain: Option<f64>,
    config: &EngineConfig,
) -> Result<()> {
    let (store, mut project, session) = open(path, config.sample_rate)?;

    let layer = project.layer_mut(layer_id)?;
    layer.set_placement(offset, trim_start, trim_end);
    if let Some(gain) = gain {
        layer.gain = sanitize_gain(gain, layer.gain);
    }
    println!(
        "{}: clip {:.3}s - {:.3}s, trim {:.3}/{:.3}, gain {:.3}",
        layer.id,
        layer.clip_start(),
        layer.clip_end(),
        layer.trim_start,
        layer.trim_end,
        layer.gain
    );

    store.save_project(&project, &session)?;
    Ok(())
}

/// Append an effect to a layer.
pub fn add_effect(
    path: &Path,
    layer_id: &str,
    effect_type: &str,
    config: &EngineConfig,
) -> Result<()> {
    let kind = EffectKind::parse(effect_type)?;
    let (store, mut project, session) = open(path, config.sample_rate)?;

    let effect_id = project.add_effect(layer_id, kind)?;
    store.save_project(&project, &session)?;

    println!("Added {} {}", kind.label(), effect_id);
    Ok(())
}

/// Add a cutoff keyframe to an effect.
pub fn add_key(
    path: &Path,
    layer_id: &str,
    effect_id: &str,
    s: f64,
    v: f64,
    config: &EngineConfig,
) -> Result<()> {
    if !s.is_finite() || !v.is_finite() {
        bail!("keyframe time and value must be finite numbers");
    }
    let (store, mut project, session) = open(path, config.sample_rate)?;

    let layer = project.layer_mut(layer_id)?;
    let source_duration = layer.source_duration();
    let effect = layer.effect_mut(effect_id)?;
    let curve = effect.freq_curve_mut(source_duration);
    curve.insert_key(Keyframe::new(s, v));
    let keys = curve.len();

    store.save_project(&project, &session)?;
    println!("{} {}: {} keys", effect_id, PARAM_FREQ, keys);
    Ok(())
}

/// Open a saved project, reporting layers that could not be restored.
fn open(path: &Path, sample_rate: u32) -> Result<(ProjectStore, Project, TransportSession)> {
    let store = ProjectStore::new(path);
    let (project, session, report) = store
        .open(sample_rate)
        .with_context(|| format!("failed to open project at {}", path.display()))?;
    for failure in &report.failed {
        eprintln!("warning: layer {} skipped: {}", failure.name, failure.error);
    }
    Ok((store, project, session))
}

/// Expand directories into the WAV files they contain, sorted by path.
fn collect_audio_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry
                        .path()
                        .extension()
                        .map_or(false, |ext| ext.eq_ignore_ascii_case(IMPORT_EXTENSION))
                })
                .map(|entry| entry.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}
