//! CLI Module
//!
//! Command-line interface for editing and rendering Mixdeck projects.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mixdeck - multi-track timeline editor and mixdown renderer
#[derive(Parser, Debug)]
#[command(name = "mixdeck-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new, empty project directory
    #[command(name = "create")]
    Create {
        /// Path for the new project
        path: PathBuf,
    },

    /// Import audio files or directories of WAV files as new layers
    #[command(name = "import")]
    Import {
        /// Path to the project
        path: PathBuf,

        /// Files or directories to import
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print layers, clip ranges and effects
    #[command(name = "info")]
    Info {
        /// Path to the project
        path: PathBuf,
    },

    /// Render the timeline to a 16-bit stereo WAV file
    #[command(name = "render")]
    Render {
        /// Path to the project
        path: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Output sample rate (defaults to the engine rate)
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Move, trim or set the gain of a layer
    #[command(name = "place")]
    Place {
        /// Path to the project
        path: PathBuf,

        /// Layer id
        layer_id: String,

        /// Timeline position in seconds
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,

        /// Seconds cut from the start of the source
        #[arg(long)]
        trim_start: Option<f64>,

        /// Seconds cut from the end of the source
        #[arg(long)]
        trim_end: Option<f64>,

        /// Linear layer gain
        #[arg(long)]
        gain: Option<f64>,
    },

    /// Append a filter effect to a layer
    #[command(name = "add-effect")]
    AddEffect {
        /// Path to the project
        path: PathBuf,

        /// Layer id
        layer_id: String,

        /// Effect type: lowpass or highpass
        effect_type: String,
    },

    /// Add a cutoff automation keyframe to an effect
    #[command(name = "add-key")]
    AddKey {
        /// Path to the project
        path: PathBuf,

        /// Layer id
        layer_id: String,

        /// Effect id
        effect_id: String,

        /// Source time in seconds
        s: f64,

        /// Cutoff frequency in Hz
        v: f64,
    },
}
