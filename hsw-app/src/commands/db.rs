//! Database operations: view, export, import, loop filter.

use super::Context;
use anyhow::Context as _;
use clap::{ArgGroup, Args};
use hsw_library::{export_csv, format_table, import_csv};
use std::path::PathBuf;

/// Inspect and move the audio library.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["view", "export_csv", "import_csv", "filter_loops"])
))]
pub struct DbArgs {
    /// Show every stored file
    #[arg(long)]
    pub view: bool,

    /// Export the library to CSV (defaults to the configured file)
    #[arg(long, value_name = "CSV", num_args = 0..=1)]
    pub export_csv: Option<Option<PathBuf>>,

    /// Import rows from a library CSV
    #[arg(long, value_name = "CSV")]
    pub import_csv: Option<PathBuf>,

    /// Show files longer than the loop threshold, longest first
    #[arg(long)]
    pub filter_loops: bool,

    /// Loop threshold in seconds (overrides the config)
    #[arg(long, value_name = "SECS", requires = "filter_loops")]
    pub min_duration: Option<f64>,
}

/// Run the db command.
pub fn run(args: DbArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let library = ctx.open_library()?;

    if args.view {
        let records = library.all()?;
        println!("\n{}", format_table("Audio Library Database:", &records));
    } else if let Some(target) = args.export_csv {
        let path = target.unwrap_or_else(|| ctx.config.export_csv.clone());
        let count = export_csv(&library, &path)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        println!("Exported {} record(s) to {}", count, path.display());
    } else if let Some(path) = args.import_csv {
        let summary = import_csv(&library, &path)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        println!(
            "Imported {} record(s) from {} ({} skipped)",
            summary.imported,
            path.display(),
            summary.skipped
        );
    } else if args.filter_loops {
        let min_duration = args.min_duration.unwrap_or(ctx.config.min_loop_duration);
        let records = library.longer_than(min_duration)?;
        let title = format!("Audio Files longer Than {} Seconds:", min_duration);
        println!("\n{}", format_table(&title, &records));
    }

    Ok(())
}
