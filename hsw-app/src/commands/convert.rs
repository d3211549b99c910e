//! Convert every audio file in a folder to another format.

use super::{folder_exists, Context};
use anyhow::Context as _;
use clap::Args;
use hsw_library::{convert_folder, TargetFormat};
use std::path::PathBuf;

/// Convert audio files to another format.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Folder of audio files (defaults to the last folder used)
    pub folder: Option<PathBuf>,

    /// Target format: wav, mp3, flac or ogg
    #[arg(short, long, default_value = "wav")]
    pub format: TargetFormat,

    /// Directory for converted files
    #[arg(short, long, value_name = "DIR", default_value = "converted_audio")]
    pub output_dir: PathBuf,
}

/// Run the convert command.
pub fn run(args: ConvertArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let folder = ctx.resolve_folder(args.folder)?;
    if !folder_exists(&folder) {
        return Ok(());
    }
    ctx.remember_folder(&folder);

    if !args.format.has_encoder() {
        tracing::warn!("No {} encoder available, every file will fail", args.format);
    }

    println!("\nConverting audio files to {}...", args.format);
    let summary = convert_folder(&folder, &args.output_dir, args.format)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    for path in &summary.converted {
        println!("Converted: {}", path.display());
    }
    println!(
        "\n{} converted, {} failed",
        summary.converted.len(),
        summary.failed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_creates_output_dir_for_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        std::fs::create_dir(&samples).unwrap();

        let mut ctx = Context::load(
            Some(dir.path().join("lib.db")),
            Some(dir.path().join("config.txt")),
        );
        let args = ConvertArgs {
            folder: Some(samples),
            format: TargetFormat::Ogg,
            output_dir: dir.path().join("converted_audio"),
        };

        run(args, &mut ctx).unwrap();
        assert!(dir.path().join("converted_audio").is_dir());
    }
}
