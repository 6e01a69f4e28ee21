//! State Management Module
//!
//! Provides the saved project schema, schema migrations, on-disk storage
//! and debounced autosave.

pub mod autosave;
pub mod migration;
pub mod project;
pub mod storage;

pub use autosave::SaveDebouncer;
pub use migration::{migrate_project, CURRENT_SCHEMA_VERSION};
pub use project::{LayerRecord, ProjectFile};
pub use storage::{ProjectStore, StorageUsage};
