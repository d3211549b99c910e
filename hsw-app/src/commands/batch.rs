//! Batch-process a whole library folder.

use super::{folder_exists, Context};
use clap::Args;
use hsw_library::{discover_or_empty, BpmAnalyzer, FeatureExtractor, FeatureOptions, ScanConfig};
use std::path::PathBuf;

/// Process every audio file under a folder.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Root folder of the library (defaults to the last folder used)
    pub folder: Option<PathBuf>,

    /// Include subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Calculate BPM
    #[arg(long)]
    pub bpm: bool,

    /// Save every file to the database
    #[arg(long)]
    pub save_db: bool,
}

/// Run the batch command.
pub fn run(args: BatchArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let folder = ctx.resolve_folder(args.folder)?;
    if !folder_exists(&folder) {
        return Ok(());
    }
    ctx.remember_folder(&folder);

    let files = discover_or_empty(&ScanConfig::new(&folder).recursive(args.recursive));
    println!("\nFound {} audio files", files.len());

    let library = if args.save_db {
        Some(ctx.open_library()?)
    } else {
        None
    };
    let mut extractor = FeatureExtractor::new(&ctx.config.output_dir);
    if let Some(library) = &library {
        extractor = extractor.with_library(library);
    }
    let analyzer = BpmAnalyzer::new();
    let save_only = FeatureOptions {
        save_db: true,
        ..Default::default()
    };

    for (i, path) in files.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("\n[{}/{}] Processing: {}", i + 1, files.len(), name);

        if args.bpm {
            if let Some(bpm) = analyzer.try_calculate_bpm(path) {
                println!("  BPM: {}", bpm);
            }
        }

        if args.save_db {
            if let Some(report) = extractor.try_check_audio_file(path, &save_only) {
                if report.saved_to_db {
                    println!("  Saved to database: {}", report.file_name);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::write_click_wav;
    use super::*;

    #[test]
    fn test_batch_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        let library_dir = dir.path().join("library");
        let nested = library_dir.join("drums");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("broken.wav"), vec![0x01u8; 32]).unwrap();
        std::fs::write(library_dir.join("readme.txt"), b"notes").unwrap();

        let mut ctx = Context::load(
            Some(dir.path().join("lib.db")),
            Some(dir.path().join("config.txt")),
        );
        let args = BatchArgs {
            folder: Some(library_dir),
            recursive: true,
            bpm: true,
            save_db: true,
        };

        run(args, &mut ctx).unwrap();
        assert_eq!(ctx.open_library().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_batch_saves_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let library_dir = dir.path().join("library");
        std::fs::create_dir(&library_dir).unwrap();
        write_click_wav(&library_dir.join("groove.wav"), 100.0, 22050, 6.0);

        let mut ctx = Context::load(
            Some(dir.path().join("lib.db")),
            Some(dir.path().join("config.txt")),
        );
        let args = BatchArgs {
            folder: Some(library_dir),
            recursive: false,
            bpm: true,
            save_db: true,
        };

        run(args, &mut ctx).unwrap();

        let library = ctx.open_library().unwrap();
        assert_eq!(library.count().unwrap(), 1);
        let record = library.get("groove.wav").unwrap().unwrap();
        assert_eq!(record.sample_rate, 22050);
        assert_eq!(record.duration_secs, 6.0);
    }
}
