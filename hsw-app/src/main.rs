//! hsoundworks - audio sample library toolkit
//!
//! BPM detection, spectral features, format conversion and a SQLite
//! catalogue of analyzed files, driven from the command line.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hsoundworks")]
#[command(version, about = "Audio sample library toolkit", long_about = None)]
#[command(after_help = "Examples:
  hsoundworks analyze ~/music --bpm --save-db
  hsoundworks convert ~/samples --format wav
  hsoundworks db --view
  hsoundworks db --export-csv output.csv")]
struct Cli {
    /// SQLite library file (overrides the config)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze audio files: BPM and features
    Analyze(commands::analyze::AnalyzeArgs),

    /// Convert audio files to another format
    Convert(commands::convert::ConvertArgs),

    /// Database operations
    Db(commands::db::DbArgs),

    /// Batch process an audio library
    Batch(commands::batch::BatchArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = commands::Context::load(cli.database, cli.config);

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args, &mut ctx)?,
        Commands::Convert(args) => commands::convert::run(args, &mut ctx)?,
        Commands::Db(args) => commands::db::run(args, &mut ctx)?,
        Commands::Batch(args) => commands::batch::run(args, &mut ctx)?,
    }

    println!("\nDone!");
    Ok(())
}

/// Logs go to stderr so reports on stdout stay clean; RUST_LOG wins over -v
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
