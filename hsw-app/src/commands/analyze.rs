//! Analyze a folder: BPM and per-file features.

use super::{folder_exists, Context};
use clap::Args;
use hsw_library::{
    discover_or_empty, write_bpm_csv, BpmAnalyzer, ExportError, FeatureExtractor, FeatureOptions,
    ScanConfig,
};
use std::path::{Path, PathBuf};

/// Analyze audio files in a folder.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Folder of audio files (defaults to the last folder used)
    pub folder: Option<PathBuf>,

    /// Calculate BPM
    #[arg(long)]
    pub bpm: bool,

    /// Report sample rate and duration of each file
    #[arg(long)]
    pub features: bool,

    /// Write waveform and feature images
    #[arg(long)]
    pub plot: bool,

    /// Extract MFCC features
    #[arg(long)]
    pub mfcc: bool,

    /// Extract chroma features
    #[arg(long)]
    pub chroma: bool,

    /// Extract a dB spectrogram
    #[arg(long)]
    pub spectrogram: bool,

    /// Save each file's properties to the database
    #[arg(long)]
    pub save_db: bool,

    /// Save BPM results to this CSV file
    #[arg(long, value_name = "CSV")]
    pub log: Option<PathBuf>,

    /// Directory for images (overrides the config)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn feature_options(&self) -> FeatureOptions {
        FeatureOptions {
            plot: self.plot,
            mfcc: self.mfcc,
            chroma: self.chroma,
            spectrogram: self.spectrogram,
            save_db: self.save_db,
        }
    }

    /// `--plot` alone only decorates a feature run
    fn wants_features(&self) -> bool {
        self.features || self.mfcc || self.chroma || self.spectrogram || self.save_db
    }
}

/// Run the analyze command.
pub fn run(args: AnalyzeArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let folder = ctx.resolve_folder(args.folder.clone())?;
    if !folder_exists(&folder) {
        return Ok(());
    }
    ctx.remember_folder(&folder);

    if !args.bpm && !args.wants_features() {
        tracing::warn!("Nothing to analyze; pass --bpm, --features, --mfcc, --chroma, --spectrogram or --save-db");
    }
    if args.log.is_some() && !args.bpm {
        tracing::warn!("--log only applies together with --bpm");
    }

    if args.bpm {
        run_bpm(&folder, args.log.as_deref());
    }

    if args.wants_features() {
        let output_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| ctx.config.output_dir.clone());
        let library = if args.save_db {
            Some(ctx.open_library()?)
        } else {
            None
        };

        let mut extractor = FeatureExtractor::new(output_dir);
        if let Some(library) = &library {
            extractor = extractor.with_library(library);
        }

        println!("\nAnalyzing audio features...");
        let options = args.feature_options();
        for path in discover_or_empty(&ScanConfig::new(&folder)) {
            if let Some(report) = extractor.try_check_audio_file(&path, &options) {
                println!("\n{}", report);
            }
        }
    }

    Ok(())
}

fn run_bpm(folder: &Path, log: Option<&Path>) {
    println!("\nCalculating BPM...");
    let results = BpmAnalyzer::new().analyze_folder(&ScanConfig::new(folder));
    for result in &results {
        println!("{} - BPM - {}", result.filename, result.bpm);
    }

    let Some(log) = log else {
        return;
    };
    match write_bpm_csv(log, &results) {
        Ok(()) => println!("\nBPM log saved to {}", log.display()),
        Err(ExportError::NoResults) => tracing::warn!("No BPM results to write to {}", log.display()),
        Err(e) => tracing::warn!("Could not write BPM log {}: {}", log.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::write_click_wav;
    use super::*;
    use hsw_library::AudioRecord;

    fn args(folder: &Path) -> AnalyzeArgs {
        AnalyzeArgs {
            folder: Some(folder.to_path_buf()),
            bpm: false,
            features: false,
            plot: false,
            mfcc: false,
            chroma: false,
            spectrogram: false,
            save_db: false,
            log: None,
            output_dir: None,
        }
    }

    #[test]
    fn test_plot_alone_does_not_run_features() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path());
        a.plot = true;
        assert!(!a.wants_features());

        a.chroma = true;
        assert!(a.wants_features());
        assert!(a.feature_options().plot && a.feature_options().chroma);
    }

    #[test]
    fn test_missing_folder_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = Context::load(None, Some(dir.path().join("config.txt")));

        let mut a = args(&dir.path().join("missing"));
        a.bpm = true;
        run(a, &mut ctx).unwrap();
        assert!(ctx.config.last_folder.is_none());
    }

    #[test]
    fn test_empty_folder_with_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        std::fs::create_dir(&samples).unwrap();
        let mut ctx = Context::load(
            Some(dir.path().join("lib.db")),
            Some(dir.path().join("config.txt")),
        );

        let mut a = args(&samples);
        a.bpm = true;
        a.save_db = true;
        a.log = Some(dir.path().join("bpm.csv"));
        run(a, &mut ctx).unwrap();

        assert!(!dir.path().join("bpm.csv").exists());
        assert_eq!(ctx.config.last_folder, Some(samples.canonicalize().unwrap()));
        assert_eq!(ctx.open_library().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_bpm_log_mfcc_and_save_db() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        std::fs::create_dir(&samples).unwrap();
        let click = samples.join("click.wav");
        write_click_wav(&click, 120.0, 22050, 10.0);

        let mut ctx = Context::load(
            Some(dir.path().join("lib.db")),
            Some(dir.path().join("config.txt")),
        );
        let log = dir.path().join("logs").join("bpm.csv");

        let mut a = args(&samples);
        a.bpm = true;
        a.mfcc = true;
        a.save_db = true;
        a.log = Some(log.clone());
        a.output_dir = Some(dir.path().join("plots"));
        run(a, &mut ctx).unwrap();

        let bpm = BpmAnalyzer::new().calculate_bpm(&click).unwrap();
        assert!((110..=130).contains(&bpm), "expected ~120 BPM, got {}", bpm);

        let contents = std::fs::read_to_string(&log).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        let expected = format!("click.wav,{}", bpm);
        assert_eq!(rows, ["filename,bpm", expected.as_str()]);

        let library = ctx.open_library().unwrap();
        assert_eq!(library.count().unwrap(), 1);
        assert_eq!(
            library.get("click.wav").unwrap(),
            Some(AudioRecord::new("click.wav", 22050, 10.0))
        );
    }
}
