//! Project Storage
//!
//! A project directory holds `project.json` and one `audio/<layer-id>.bin`
//! file per layer with the clip's original encoded bytes. The SHA-256 of
//! every clip file is kept in the document and verified on load.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::TransportSession;
use crate::error::{MixdeckError, Result};
use crate::layers::{ImportFailure, ImportReport, Project};
use crate::state::migration::migrate_project;
use crate::state::project::{
    checksum, checksum_failure, LayerRecord, ProjectFile, AUDIO_DIR, AUDIO_EXTENSION,
    PROJECT_FILE,
};

/// Storage usage statistics.
#[derive(Debug, Clone)]
pub struct StorageUsage {
    /// Number of clip files.
    pub file_count: usize,
    /// Total size in bytes.
    pub total_size_bytes: u64,
    /// Total size in megabytes.
    pub total_size_mb: f64,
}

/// A project directory on disk.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the project.json file.
    pub fn project_file_path(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    /// Path to the clip directory.
    pub fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    /// Whether a saved project exists here.
    pub fn exists(&self) -> bool {
        self.project_file_path().is_file()
    }

    /// Create the directory structure and an empty document.
    pub fn create(&self) -> Result<()> {
        if self.exists() {
            return Err(MixdeckError::ProjectError {
                reason: format!("project already exists at {}", self.root.display()),
            });
        }
        fs::create_dir_all(self.audio_dir())?;
        self.save(&ProjectFile::empty())?;
        info!(path = %self.root.display(), "project created");
        Ok(())
    }

    /// Write the document and every clip file, then drop clip files no
    /// layer refers to any more.
    pub fn save(&self, file: &ProjectFile) -> Result<()> {
        let audio_dir = self.audio_dir();
        fs::create_dir_all(&audio_dir)?;

        for record in &file.layers {
            self.write_clip(record)?;
        }

        let content = serde_json::to_string_pretty(file)?;
        let target = self.project_file_path();
        let staging = target.with_extension("json.tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &target)?;

        let referenced: HashSet<String> = file
            .layers
            .iter()
            .map(|record| format!("{}.{}", record.id, AUDIO_EXTENSION))
            .collect();
        let freed = self.prune_orphaned_audio(&referenced)?;

        debug!(
            path = %target.display(),
            layers = file.layers.len(),
            bytes_freed = freed,
            "project saved"
        );
        Ok(())
    }

    /// Snapshot `project` and `session` and save them.
    pub fn save_project(&self, project: &Project, session: &TransportSession) -> Result<()> {
        self.save(&project.to_file(session))
    }

    /// Read the document and the clip bytes of every layer.
    ///
    /// Layers whose clip file is missing, unsafe or fails its checksum are
    /// removed from the returned document and listed in the report.
    pub fn load(&self) -> Result<(ProjectFile, ImportReport)> {
        let path = self.project_file_path();
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MixdeckError::FileNotFound {
                path: path.display().to_string(),
                source: Some(e),
            },
            _ => MixdeckError::Io(e),
        })?;

        let data: serde_json::Value = serde_json::from_str(&content)?;
        let data = migrate_project(data)?;
        let mut file: ProjectFile = serde_json::from_value(data)?;

        let mut report = ImportReport::default();
        let mut layers = Vec::with_capacity(file.layers.len());
        for mut record in std::mem::take(&mut file.layers) {
            match self.read_clip(&record) {
                Ok(bytes) => {
                    record.raw_audio = bytes;
                    layers.push(record);
                }
                Err(failure) => {
                    warn!(layer = %failure.name, error = %failure.error, "clip file rejected");
                    report.failed.push(failure);
                }
            }
        }
        file.layers = layers;
        Ok((file, report))
    }

    /// Load and rehydrate a playable project.
    pub fn open(&self, sample_rate: u32) -> Result<(Project, TransportSession, ImportReport)> {
        let (file, mut report) = self.load()?;
        let (project, session, decoded) = Project::from_file(file, sample_rate);
        report.merge(decoded);
        Ok((project, session, report))
    }

    /// Remove the saved document and every clip file.
    pub fn clear(&self) -> Result<()> {
        let path = self.project_file_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let audio_dir = self.audio_dir();
        if audio_dir.exists() {
            fs::remove_dir_all(&audio_dir)?;
        }
        info!(path = %self.root.display(), "project cleared");
        Ok(())
    }

    /// Delete clip files whose names are not in `referenced`.
    ///
    /// Returns the total bytes freed.
    pub fn prune_orphaned_audio(&self, referenced: &HashSet<String>) -> Result<u64> {
        let audio_dir = self.audio_dir();
        if !audio_dir.exists() {
            return Ok(0);
        }

        let mut bytes_freed = 0;
        for entry in fs::read_dir(&audio_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            let is_clip = Path::new(&file_name)
                .extension()
                .map_or(false, |ext| ext == AUDIO_EXTENSION);
            if !is_clip || referenced.contains(&file_name) {
                continue;
            }
            bytes_freed += entry.metadata().map(|m| m.len()).unwrap_or(0);
            fs::remove_file(entry.path())?;
            debug!(file = %file_name, "removed orphaned clip file");
        }
        Ok(bytes_freed)
    }

    /// Calculate current storage usage for clip files.
    pub fn storage_usage(&self) -> Result<StorageUsage> {
        let audio_dir = self.audio_dir();
        let mut file_count = 0;
        let mut total_size_bytes = 0;
        if audio_dir.exists() {
            for entry in fs::read_dir(&audio_dir)? {
                let metadata = entry?.metadata()?;
                if metadata.is_file() {
                    file_count += 1;
                    total_size_bytes += metadata.len();
                }
            }
        }
        Ok(StorageUsage {
            file_count,
            total_size_bytes,
            total_size_mb: total_size_bytes as f64 / (1024.0 * 1024.0),
        })
    }

    fn write_clip(&self, record: &LayerRecord) -> Result<()> {
        let path = self.resolve(&record.audio_file).ok_or_else(|| MixdeckError::ProjectError {
            reason: format!("unsafe audio path {}", record.audio_file),
        })?;
        let expected = if record.checksum.is_empty() {
            checksum(&record.raw_audio)
        } else {
            record.checksum.clone()
        };
        if let Ok(existing) = fs::read(&path) {
            if checksum(&existing) == expected {
                return Ok(());
            }
            debug!(path = %path.display(), "stale clip file rewritten");
        }
        fs::write(&path, &record.raw_audio)?;
        Ok(())
    }

    fn read_clip(&self, record: &LayerRecord) -> std::result::Result<Vec<u8>, ImportFailure> {
        let name = record.display_name().to_string();
        if record.audio_file.is_empty() {
            return Err(ImportFailure {
                name,
                error: MixdeckError::ProjectError {
                    reason: "layer has no stored audio".to_string(),
                },
            });
        }
        let path = match self.resolve(&record.audio_file) {
            Some(path) => path,
            None => {
                return Err(ImportFailure {
                    name,
                    error: MixdeckError::ProjectError {
                        reason: format!("unsafe audio path {}", record.audio_file),
                    },
                })
            }
        };
        let bytes = fs::read(&path).map_err(|e| ImportFailure {
            name: name.clone(),
            error: MixdeckError::FileNotFound {
                path: path.display().to_string(),
                source: Some(e),
            },
        })?;
        if !record.checksum.is_empty() && checksum(&bytes) != record.checksum {
            return Err(checksum_failure(record));
        }
        Ok(bytes)
    }

    /// Join a relative clip path onto the root; `None` if it would escape.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if safe && relative.components().next().is_some() {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::EffectKind;
    use crate::engine::io::{encode_wav, generate_test_tone};
    use tempfile::TempDir;

    fn wav_bytes(secs: f32) -> Vec<u8> {
        encode_wav(&generate_test_tone(220.0, secs, 8000)).unwrap()
    }

    fn store() -> (TempDir, ProjectStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(temp_dir.path().join("project"));
        (temp_dir, store)
    }

    #[test]
    fn test_create_and_reopen_empty_project() {
        let (_temp, store) = store();
        store.create().unwrap();
        assert!(store.exists());
        assert!(store.audio_dir().is_dir());

        let (project, session, report) = store.open(8000).unwrap();
        assert!(project.is_empty());
        assert!(session.is_stopped());
        assert!(report.is_clean());
    }

    #[test]
    fn test_create_twice_fails() {
        let (_temp, store) = store();
        store.create().unwrap();
        assert!(matches!(
            store.create(),
            Err(MixdeckError::ProjectError { .. })
        ));
    }

    #[test]
    fn test_load_missing_project() {
        let (_temp, store) = store();
        assert!(matches!(
            store.load(),
            Err(MixdeckError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_save_and_open_round_trip() {
        let (_temp, store) = store();
        let mut project = Project::new(8000);
        let id = project.import_bytes("tone.wav", wav_bytes(1.0)).unwrap();
        project.layer_mut(&id).unwrap().offset = 1.5;
        project.add_effect(&id, EffectKind::Highpass).unwrap();

        store.save_project(&project, &TransportSession::new()).unwrap();
        assert!(store.audio_dir().join(format!("{}.bin", id)).is_file());

        let (restored, _, report) = store.open(8000).unwrap();
        assert!(report.is_clean());
        let layer = restored.layer(&id).unwrap();
        assert_eq!(layer.offset, 1.5);
        assert_eq!(&layer.raw_audio()[..], &project.layers()[0].raw_audio()[..]);
        assert_eq!(layer.effects[0].kind, EffectKind::Highpass);
    }

    #[test]
    fn test_corrupted_clip_fails_checksum() {
        let (_temp, store) = store();
        let mut project = Project::new(8000);
        let keep = project.import_bytes("keep.wav", wav_bytes(0.5)).unwrap();
        let broken = project.import_bytes("broken.wav", wav_bytes(0.5)).unwrap();
        store.save_project(&project, &TransportSession::new()).unwrap();

        let clip = store.audio_dir().join(format!("{}.bin", broken));
        let mut bytes = fs::read(&clip).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&clip, bytes).unwrap();

        let (restored, _, report) = store.open(8000).unwrap();
        assert!(restored.layer(&keep).is_some());
        assert!(restored.layer(&broken).is_none());
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed[0].error,
            MixdeckError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_resave_repairs_same_size_clip() {
        let (_temp, store) = store();
        let mut project = Project::new(8000);
        let id = project.import_bytes("tone.wav", wav_bytes(0.5)).unwrap();
        store.save_project(&project, &TransportSession::new()).unwrap();

        let clip = store.audio_dir().join(format!("{}.bin", id));
        let original = fs::read(&clip).unwrap();
        fs::write(&clip, vec![0u8; original.len()]).unwrap();

        store.save_project(&project, &TransportSession::new()).unwrap();
        assert_eq!(fs::read(&clip).unwrap(), original);

        let (restored, _, report) = store.open(8000).unwrap();
        assert!(report.is_clean());
        assert!(restored.layer(&id).is_some());
    }

    #[test]
    fn test_removed_layer_clip_is_pruned() {
        let (_temp, store) = store();
        let mut project = Project::new(8000);
        let id = project.import_bytes("gone.wav", wav_bytes(0.5)).unwrap();
        store.save_project(&project, &TransportSession::new()).unwrap();
        let clip = store.audio_dir().join(format!("{}.bin", id));
        assert!(clip.exists());

        project.remove_layer(&id).unwrap();
        store.save_project(&project, &TransportSession::new()).unwrap();
        assert!(!clip.exists());
        assert_eq!(store.storage_usage().unwrap().file_count, 0);
    }

    #[test]
    fn test_unsafe_audio_path_is_rejected() {
        let (_temp, store) = store();
        store.create().unwrap();
        let document = serde_json::json!({
            "schema_version": "1.0.0",
            "layers": [{ "id": "x", "name": "x.wav", "audio_file": "../outside.bin" }]
        });
        fs::write(store.project_file_path(), document.to_string()).unwrap();

        let (file, report) = store.load().unwrap();
        assert!(file.layers.is_empty());
        assert_eq!(report.failed[0].name, "x.wav");
    }

    #[test]
    fn test_legacy_document_is_migrated() {
        let (_temp, store) = store();
        store.create().unwrap();
        let document = serde_json::json!({
            "masterVol": 0.25,
            "playheadTime": 2.0,
            "pxPerSec": 400,
            "layers": []
        });
        fs::write(store.project_file_path(), document.to_string()).unwrap();

        let (project, session, _) = store.open(8000).unwrap();
        assert_eq!(project.master_gain, 0.25);
        assert_eq!(project.px_per_sec, 400.0);
        assert_eq!(session.playhead_time(), 2.0);
        assert_eq!(session.play_session_start_time(), 2.0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (_temp, store) = store();
        let mut project = Project::new(8000);
        project.import_bytes("a.wav", wav_bytes(0.5)).unwrap();
        store.save_project(&project, &TransportSession::new()).unwrap();
        store.clear().unwrap();
        assert!(!store.exists());
        assert!(!store.audio_dir().exists());
    }
}
