//! Pulso CLI - drive the engine's offline tools from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulso")]
#[command(author, version, about = "Pulso DJ engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a track: tempo, key, Camelot, energy
    Analyze(commands::analyze::AnalyzeArgs),

    /// Time-stretch / pitch-shift a track
    Stretch(commands::stretch::StretchArgs),

    /// Play a track through the engine
    Play(commands::play::PlayArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// List the effect catalog and parameter ranges
    Effects(commands::effects::EffectsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Stretch(args) => commands::stretch::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Effects(args) => commands::effects::run(args),
    }
}
