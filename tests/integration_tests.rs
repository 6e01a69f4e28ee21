//! Integration Tests
//!
//! End-to-end tests for the Mixdeck timeline: playback on the software
//! device, offline mixdown, WAV output and project persistence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

use mixdeck::automation::Keyframe;
use mixdeck::dsp::{build_signal_path, EffectKind, PARAM_FREQ};
use mixdeck::engine::{
    encode_wav, generate_test_tone, plan_layer, render_mixdown, AudioBuffer, AudioDevice, Player,
    SoftwareDevice, TickStatus, TransportState,
};
use mixdeck::layers::{project_duration, Layer, Project};
use mixdeck::state::{migrate_project, ProjectFile, ProjectStore, CURRENT_SCHEMA_VERSION};
use mixdeck::EngineConfig;

const RATE: u32 = 1000;

/// Stereo DC clip of `secs` seconds at `level`
fn dc_layer(level: f32, secs: f64, offset: f64) -> Layer {
    let frames = (secs * RATE as f64) as usize;
    let source = AudioBuffer::from_channels(vec![vec![level; frames]; 2], RATE).unwrap();
    let mut layer = Layer::new("dc", Arc::new(source), Arc::from(Vec::new()));
    layer.offset = offset;
    layer
}

fn project_with(layers: Vec<Layer>) -> Project {
    let mut project = Project::new(RATE);
    for layer in layers {
        project.push_layer(layer);
    }
    project
}

fn player() -> Player<SoftwareDevice> {
    let config = EngineConfig {
        sample_rate: RATE,
        ..EngineConfig::default()
    };
    Player::new(SoftwareDevice::new(RATE), config)
}

fn wav_bytes(secs: f32) -> Vec<u8> {
    encode_wav(&generate_test_tone(220.0, secs, RATE)).unwrap()
}

// === Scheduling ===

#[test]
fn test_clip_geometry_and_cursor_mapping() {
    // 10 s source trimmed 2/1 and placed at 3: audible from 3 to 10
    let source = AudioBuffer::from_channels(vec![vec![0.0; 10 * RATE as usize]], RATE).unwrap();
    let mut layer = Layer::new("clip", Arc::new(source), Arc::from(Vec::new()));
    layer.set_placement(Some(3.0), Some(2.0), Some(1.0));

    assert_abs_diff_eq!(layer.clip_duration(), 7.0, epsilon = 1e-12);
    assert_abs_diff_eq!(layer.clip_end(), 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        project_duration(std::slice::from_ref(&layer)),
        10.0,
        epsilon = 1e-12
    );
    assert_eq!(project_duration(&[]), 0.0);

    let inside = plan_layer(&layer, 5.0, 20.0, 1e-4).unwrap();
    assert_abs_diff_eq!(inside.when, 20.0, epsilon = 1e-12);
    assert_abs_diff_eq!(inside.offset, 4.0, epsilon = 1e-12);
    assert_abs_diff_eq!(inside.duration, 5.0, epsilon = 1e-12);

    let before = plan_layer(&layer, 1.0, 20.0, 1e-4).unwrap();
    assert_abs_diff_eq!(before.when, 22.0, epsilon = 1e-12);
    assert_abs_diff_eq!(before.offset, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(before.duration, 7.0, epsilon = 1e-12);

    assert!(plan_layer(&layer, 10.0, 20.0, 1e-4).is_none());
}

#[test]
fn test_default_cutoff_curve_is_constant_over_played_range() {
    let mut layer = dc_layer(0.0, 4.0, 0.0);
    layer.add_effect(EffectKind::Lowpass);
    let plan = plan_layer(&layer, 1.0, 0.0, 1e-4).unwrap();

    let path = build_signal_path(
        &layer,
        Some(&plan.play_context()),
        &EngineConfig::default().automation,
    );
    assert_eq!(path.len(), 1);
    let curve = path.stages[0].freq_curve.as_ref().unwrap();
    assert!(curve.values.len() >= 64);
    assert!(curve
        .values
        .iter()
        .all(|&v| (v - EffectKind::Lowpass.default_freq()).abs() < 1e-9));
}

// === Playback ===

#[test]
fn test_playback_starts_clip_at_its_timeline_position() {
    let project = project_with(vec![dc_layer(0.5, 2.0, 1.0)]);
    let mut player = player();
    player.play(&project).unwrap().unwrap();

    // lead 0.05 s plus 1 s of silence before the clip
    player.device_mut().advance(1.0);
    assert_eq!(player.device().output_peak(), 0.0);

    player.device_mut().advance(0.1);
    assert_abs_diff_eq!(player.device().output_peak(), 0.5, epsilon = 1e-6);
}

#[test]
fn test_playback_runs_to_end_and_rewinds() {
    let project = project_with(vec![dc_layer(0.5, 2.0, 1.0)]);
    let mut player = player();
    let token = player.play(&project).unwrap().unwrap();

    player.device_mut().advance(1.5);
    match player.tick(token, &project) {
        TickStatus::Playing { time } => assert_abs_diff_eq!(time, 1.45, epsilon = 1e-9),
        other => panic!("expected playing, got {:?}", other),
    }

    player.device_mut().advance(1.6);
    assert!(matches!(player.tick(token, &project), TickStatus::Ended { .. }));
    assert_eq!(player.state(), TransportState::Stopped);
    assert_eq!(player.session().playhead_time(), 0.0);
    assert_eq!(player.tick(token, &project), TickStatus::Stale);
}

#[test]
fn test_pause_resume_then_stop_returns_to_session_start() {
    let project = project_with(vec![dc_layer(0.5, 4.0, 0.0)]);
    let mut player = player();
    player.seek(&project, 0.5);
    player.play(&project).unwrap();

    player.device_mut().advance(1.05);
    player.pause(&project);
    assert_eq!(player.state(), TransportState::Paused);
    assert_abs_diff_eq!(player.session().playhead_time(), 1.5, epsilon = 1e-9);

    // resuming keeps the original session start
    player.play(&project).unwrap();
    assert_abs_diff_eq!(player.session().play_session_start_time(), 0.5, epsilon = 1e-12);

    player.stop(&project);
    assert_eq!(player.state(), TransportState::Stopped);
    assert_abs_diff_eq!(player.session().playhead_time(), 0.5, epsilon = 1e-12);

    // a second stop changes nothing
    player.stop(&project);
    assert_abs_diff_eq!(player.session().playhead_time(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_seek_invalidates_previous_tick_token() {
    let project = project_with(vec![dc_layer(0.5, 4.0, 0.0)]);
    let mut player = player();
    let first = player.play(&project).unwrap().unwrap();
    let second = player.seek(&project, 2.0).unwrap();

    player.device_mut().advance(0.1);
    assert_eq!(player.tick(first, &project), TickStatus::Stale);
    assert!(matches!(player.tick(second, &project), TickStatus::Playing { .. }));
    assert_abs_diff_eq!(player.session().play_session_start_time(), 2.0, epsilon = 1e-12);
}

#[test]
fn test_scrub_restarts_are_throttled() {
    let project = project_with(vec![dc_layer(0.5, 4.0, 0.0)]);
    let mut player = player();
    player.play(&project).unwrap();

    let t0 = Instant::now();
    assert!(player.begin_scrub(&project, 1.0, t0).is_some());
    assert!(player
        .scrub_to(&project, 1.2, t0 + Duration::from_millis(50))
        .is_none());
    assert_abs_diff_eq!(player.session().playhead_time(), 1.2, epsilon = 1e-12);
    assert!(player
        .scrub_to(&project, 1.6, t0 + Duration::from_millis(150))
        .is_some());

    assert!(player.end_scrub(&project, 2.0).is_some());
    assert!(!player.is_scrubbing());
    assert!(player.session().is_playing());

    // stop returns to where the drag was released
    player.stop(&project);
    assert_abs_diff_eq!(player.session().playhead_time(), 2.0, epsilon = 1e-12);
}

// === Real-time and Offline Agreement ===

#[test]
fn test_playback_matches_offline_mixdown() {
    let mut layer = Layer::new(
        "tone",
        Arc::new(generate_test_tone(120.0, 2.0, RATE)),
        Arc::from(Vec::new()),
    );
    layer.gain = 0.8;
    layer.set_placement(Some(0.5), Some(0.25), Some(0.5));
    let effect_id = layer.add_effect(EffectKind::Lowpass);
    {
        let source_duration = layer.source_duration();
        let curve = layer
            .effect_mut(&effect_id)
            .unwrap()
            .freq_curve_mut(source_duration);
        curve.insert_key(Keyframe::new(0.5, 300.0));
        curve.insert_key(Keyframe::new(1.2, 40.0));
    }
    let mut project = project_with(vec![layer]);
    project.master_gain = 0.9;

    let config = EngineConfig::default();
    let offline = render_mixdown(
        project.layers(),
        project.effective_master_gain(),
        RATE,
        &config.automation,
    )
    .unwrap();
    // clip ends at 0.5 + 2.0 - 0.25 - 0.5
    assert_eq!(offline.len(), 1750);
    assert!(offline.peak() > 0.01);

    let mut player = player();
    player.play(&project).unwrap().unwrap();
    let lead_frames = (config.scheduling_lead_secs * RATE as f64).round() as usize;
    let lead = player.device_mut().render(lead_frames);
    assert_eq!(lead.peak(), 0.0);
    let realtime = player.device_mut().render(offline.len());

    assert_eq!(realtime.channels(), offline.channels());
    for ch in 0..offline.channels() {
        for (i, (&rt, &off)) in realtime
            .channel(ch)
            .iter()
            .zip(offline.channel(ch))
            .enumerate()
        {
            assert!(
                (rt - off).abs() < 1e-5,
                "channel {} frame {}: realtime {} offline {}",
                ch,
                i,
                rt,
                off
            );
        }
    }
}

// === Offline Mixdown ===

#[test]
fn test_render_and_encode_mixdown() {
    let mut quiet = dc_layer(0.5, 1.0, 0.5);
    quiet.gain = 0.5;
    let project = project_with(vec![dc_layer(0.25, 1.0, 0.0), quiet]);

    let mix = render_mixdown(project.layers(), 1.0, RATE, &EngineConfig::default().automation)
        .unwrap();
    assert_eq!(mix.len(), 1500);
    assert_abs_diff_eq!(mix.channel(0)[100], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(mix.channel(0)[700], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(mix.channel(1)[1200], 0.25, epsilon = 1e-6);

    let bytes = encode_wav(&mix).unwrap();
    assert_eq!(bytes.len(), 44 + 4 * 1500);
    assert_eq!(&bytes[0..4], b"RIFF");
}

#[test]
fn test_render_empty_project_yields_nothing() {
    assert!(render_mixdown(&[], 1.0, RATE, &EngineConfig::default().automation).is_none());
}

// === Import and Persistence ===

#[test]
fn test_import_batch_isolates_failures() {
    let mut project = Project::new(RATE);
    let report = project.import_batch(vec![
        ("good.wav".to_string(), wav_bytes(0.5)),
        ("bad.wav".to_string(), b"definitely not audio".to_vec()),
        ("also-good.wav".to_string(), wav_bytes(0.25)),
    ]);
    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "bad.wav");
    assert_eq!(project.layers().len(), 2);
    assert_abs_diff_eq!(project.duration(), 0.5, epsilon = 1e-9);
}

#[test]
fn test_project_survives_save_and_reload() {
    let temp = tempdir().unwrap();
    let store = ProjectStore::new(temp.path().join("song"));
    store.create().unwrap();

    let mut project = Project::new(RATE);
    let id = project.import_bytes("tone.wav", wav_bytes(2.0)).unwrap();
    project.master_gain = 0.8;
    let effect_id = project.add_effect(&id, EffectKind::Highpass).unwrap();
    {
        let layer = project.layer_mut(&id).unwrap();
        layer.set_placement(Some(1.5), Some(0.25), None);
        let source_duration = layer.source_duration();
        layer
            .effect_mut(&effect_id)
            .unwrap()
            .freq_curve_mut(source_duration)
            .insert_key(Keyframe::new(1.5, 400.0));
    }

    let mut player = player();
    player.seek(&project, 2.0);
    store.save_project(&project, player.session()).unwrap();

    let (restored, session, report) = store.open(RATE).unwrap();
    assert!(report.is_clean());
    assert_abs_diff_eq!(restored.master_gain, 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(session.playhead_time(), 2.0, epsilon = 1e-12);

    let layer = restored.layer(&id).unwrap();
    assert_abs_diff_eq!(layer.offset, 1.5, epsilon = 1e-12);
    assert_abs_diff_eq!(layer.trim_start, 0.25, epsilon = 1e-12);
    assert_eq!(layer.effects.len(), 1);
    let curve = layer.effects[0].automation.get(PARAM_FREQ).unwrap();
    assert_eq!(curve.len(), 2);
    assert_abs_diff_eq!(curve.value_at(1.5, 0.0), 400.0, epsilon = 1e-9);
}

#[test]
fn test_legacy_document_migrates_to_current_schema() {
    let legacy = serde_json::json!({
        "masterVol": 0.5,
        "pxPerSec": 200.0,
        "layers": []
    });
    let migrated = migrate_project(legacy).unwrap();
    let file: ProjectFile = serde_json::from_value(migrated).unwrap();
    assert_eq!(file.schema_version, CURRENT_SCHEMA_VERSION);
    assert_abs_diff_eq!(file.master_volume_gain, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(file.px_per_sec, 200.0, epsilon = 1e-12);
}
