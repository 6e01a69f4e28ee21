//! Mixdeck CLI - Timeline Editing and Mixdown
//!
//! Command-line interface for Mixdeck projects.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mixdeck::cli::{commands, Cli, Commands};
use mixdeck::EngineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Mixdeck v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(?config, "engine configuration");

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Mixdeck v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &EngineConfig) -> Result<()> {
    match cmd {
        Commands::Create { path } => commands::create(&path),
        Commands::Import { path, inputs } => commands::import(&path, &inputs, config),
        Commands::Info { path } => commands::info(&path, config),
        Commands::Render {
            path,
            output,
            sample_rate,
        } => commands::render(&path, &output, sample_rate, config),
        Commands::Place {
            path,
            layer_id,
            offset,
            trim_start,
            trim_end,
            gain,
        } => commands::place(
            &path, &layer_id, offset, trim_start, trim_end, gain, config,
        ),
        Commands::AddEffect {
            path,
            layer_id,
            effect_type,
        } => commands::add_effect(&path, &layer_id, &effect_type, config),
        Commands::AddKey {
            path,
            layer_id,
            effect_id,
            s,
            v,
        } => commands::add_key(&path, &layer_id, &effect_id, s, v, config),
    }
}
