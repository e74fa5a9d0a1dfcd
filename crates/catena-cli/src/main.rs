//! Catena CLI - run chain strings over audio files.

mod commands;

use catena_registry::Registry;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catena")]
#[command(author, version, about = "Catena chain engine CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Preset library file ("name = chain" lines) usable with -pn:<name>
    #[arg(long, value_name = "FILE", global = true)]
    presets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file through a chain
    Process(commands::process::ProcessArgs),

    /// List chain operators and their parameters
    Operators(commands::operators::OperatorsArgs),

    /// List controller sources and their parameters
    Controllers(commands::controllers::ControllersArgs),

    /// Parse a chain string and show what it builds
    Check(commands::check::CheckArgs),

    /// Show WAV file metadata
    Info(commands::info::InfoArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v when set.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn registry(presets: Option<&Path>) -> anyhow::Result<Registry> {
    let mut registry = Registry::new();
    if let Some(path) = presets {
        let count = catena_config::load_presets(path, &mut registry)?;
        tracing::info!(path = %path.display(), presets = count, "preset library loaded");
    }
    Ok(registry)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let registry = registry(cli.presets.as_deref())?;

    match cli.command {
        Commands::Process(args) => commands::process::run(args, &registry),
        Commands::Operators(args) => commands::operators::run(args, &registry),
        Commands::Controllers(args) => commands::controllers::run(args, &registry),
        Commands::Check(args) => commands::check::run(args, &registry),
        Commands::Info(args) => commands::info::run(args),
    }
}
