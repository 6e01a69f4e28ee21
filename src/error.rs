//! Error handling for Mixdeck
//!
//! No error in the engine is fatal. Decode failures are isolated to the file
//! that caused them, invalid times are clamped, degenerate clips are skipped.

use thiserror::Error;

/// Result type alias for Mixdeck operations
pub type Result<T> = std::result::Result<T, MixdeckError>;

/// Main error type for Mixdeck operations
#[derive(Error, Debug)]
pub enum MixdeckError {
    // Decode / file errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio data: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Model errors
    #[error("Unknown effect type: {effect_type}")]
    UnknownEffect { effect_type: String },

    #[error("Layer not found: {layer_id}")]
    LayerNotFound { layer_id: String },

    #[error("Effect not found: {effect_id}")]
    EffectNotFound { effect_id: String },

    // Device errors
    #[error("Scheduled source not found: {source_id}")]
    SourceNotFound { source_id: u64 },

    #[error("Audio device error: {reason}")]
    DeviceError { reason: String },

    // Persistence errors
    #[error("Checksum mismatch for {path}")]
    ChecksumMismatch { path: String },

    #[error("Invalid schema version: {version}")]
    InvalidSchemaVersion { version: String },

    #[error("Migration from {from} to {to} failed: {reason}")]
    MigrationError {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Project file error: {reason}")]
    ProjectError { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixdeckError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixdeckError::FileNotFound { .. } => "FILE_NOT_FOUND",
            MixdeckError::InvalidAudio { .. } => "INVALID_AUDIO",
            MixdeckError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            MixdeckError::EmptyAudio => "EMPTY_AUDIO",
            MixdeckError::UnknownEffect { .. } => "UNKNOWN_EFFECT",
            MixdeckError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            MixdeckError::EffectNotFound { .. } => "EFFECT_NOT_FOUND",
            MixdeckError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            MixdeckError::DeviceError { .. } => "DEVICE_ERROR",
            MixdeckError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            MixdeckError::InvalidSchemaVersion { .. } => "INVALID_SCHEMA_VERSION",
            MixdeckError::MigrationError { .. } => "MIGRATION_ERROR",
            MixdeckError::ProjectError { .. } => "PROJECT_ERROR",
            MixdeckError::Io(_) => "IO_ERROR",
            MixdeckError::Wav(_) => "WAV_ERROR",
            MixdeckError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the application can keep operating on in-memory state
    pub fn is_recoverable(&self) -> bool {
        match self {
            MixdeckError::FileNotFound { .. } => true,
            MixdeckError::InvalidAudio { .. } => true,
            MixdeckError::UnsupportedFormat { .. } => true,
            MixdeckError::EmptyAudio => true,
            MixdeckError::SourceNotFound { .. } => true,
            MixdeckError::ChecksumMismatch { .. } => true,
            MixdeckError::Io(_) => true,
            MixdeckError::Wav(_) => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MixdeckError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            MixdeckError::InvalidAudio { .. } | MixdeckError::Wav(_) => vec![
                "Import failed. Try WAV first",
                "The file may be corrupted - try re-exporting from source",
            ],
            MixdeckError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV file",
                "Supported sample formats: 8/16/24/32-bit integer, 32-bit float",
            ],
            MixdeckError::EmptyAudio => vec!["The file decoded to zero samples"],
            MixdeckError::ChecksumMismatch { .. } => vec![
                "The stored clip audio was modified outside the application",
                "Re-import the clip from its original file",
            ],
            MixdeckError::InvalidSchemaVersion { .. } => {
                vec!["The project was saved by a newer version - upgrade mixdeck"]
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MixdeckError::FileNotFound {
            path: "test.wav".to_string(),
            source: None,
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert_eq!(
            MixdeckError::SourceNotFound { source_id: 3 }.error_code(),
            "SOURCE_NOT_FOUND"
        );
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = MixdeckError::InvalidAudio {
            reason: "bad header".to_string(),
            source: None,
        };
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_schema_errors_are_not_recoverable() {
        let err = MixdeckError::InvalidSchemaVersion {
            version: "9.0.0".to_string(),
        };
        assert!(!err.is_recoverable());
    }
}
