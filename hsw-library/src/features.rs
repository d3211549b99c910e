//! Per-file feature inspection: basic properties, MFCC, chroma, spectrogram

use crate::loader::{AudioLoader, LoadError};
use crate::plot::{plot_path, save_heatmap, save_waveform, PlotError};
use crate::store::AudioLibrary;
use hsw_analysis::{chroma_stft, mfcc, stft_db, FeatureMatrix, DEFAULT_MFCC_COEFFICIENTS};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that stop a file from being inspected at all
///
/// Failures in individual features, plots, or the database save are only
/// logged; the rest of the report is still produced.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Invalid duration ({duration}s) for file: {path}")]
    InvalidDuration { path: PathBuf, duration: f64 },
}

/// Which extras to compute for each file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureOptions {
    /// Write images for the waveform and every computed feature
    pub plot: bool,
    pub mfcc: bool,
    pub chroma: bool,
    pub spectrogram: bool,
    /// Store sample rate and duration in the library
    pub save_db: bool,
}

impl FeatureOptions {
    /// Whether anything beyond the basic properties was requested
    pub fn any(&self) -> bool {
        self.plot || self.mfcc || self.chroma || self.spectrogram || self.save_db
    }
}

/// What was learned about one file
#[derive(Debug, Clone, Default)]
pub struct FeatureReport {
    pub file_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    pub mfcc: Option<FeatureMatrix>,
    pub chroma: Option<FeatureMatrix>,
    pub spectrogram: Option<FeatureMatrix>,
    pub saved_to_db: bool,
    /// Images written for this file
    pub plots: Vec<PathBuf>,
}

impl fmt::Display for FeatureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.file_name)?;
        writeln!(f, "Sample Rate: {} Hz", self.sample_rate)?;
        write!(f, "Duration: {}", format_duration(self.duration_secs))?;

        let features = [
            ("MFCC", &self.mfcc),
            ("Chroma", &self.chroma),
            ("Spectrogram", &self.spectrogram),
        ];
        for (name, matrix) in features {
            if let Some(matrix) = matrix {
                write!(f, "\n{}: {} x {}", name, matrix.rows(), matrix.cols())?;
            }
        }

        for plot in &self.plots {
            write!(f, "\nSaved plot to: {}", plot.display())?;
        }
        Ok(())
    }
}

/// Format seconds as `H:MM:SS`, rounded to the nearest second
pub fn format_duration(duration_secs: f64) -> String {
    let total = duration_secs.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Inspects files at their native sample rate
pub struct FeatureExtractor<'a> {
    loader: AudioLoader,
    output_dir: PathBuf,
    library: Option<&'a AudioLibrary>,
}

impl<'a> FeatureExtractor<'a> {
    /// Extractor writing images under `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: AudioLoader::new(),
            output_dir: output_dir.into(),
            library: None,
        }
    }

    /// Library used when `save_db` is requested
    pub fn with_library(mut self, library: &'a AudioLibrary) -> Self {
        self.library = Some(library);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Load a file, report its properties, and compute the requested extras
    pub fn check_audio_file(
        &self,
        path: &Path,
        options: &FeatureOptions,
    ) -> Result<FeatureReport, FeatureError> {
        let audio = self.loader.load(path)?;

        let duration = audio.duration_secs();
        if duration <= 0.0 {
            return Err(FeatureError::InvalidDuration {
                path: path.to_path_buf(),
                duration,
            });
        }

        let mono = audio.to_mono();
        let sr = audio.sample_rate;
        let mut plots = Vec::new();

        let saved_to_db = options.save_db && self.save_to_library(path, sr, duration);

        if options.plot {
            let title = format!("Waveform of {}", audio.file_name);
            let saved = plot_path(&self.output_dir, path, "waveform")
                .and_then(|out| save_waveform(&mono, &title, &out).map(|()| out));
            self.keep_plot(&mut plots, path, "waveform", saved);
        }

        let raw_mfcc = options.mfcc.then(|| mfcc(&mono, sr, DEFAULT_MFCC_COEFFICIENTS));
        let raw_chroma = options.chroma.then(|| chroma_stft(&mono, sr));
        let raw_spectrogram = options.spectrogram.then(|| stft_db(&mono));

        let mut keep = |title: &str, matrix: Option<FeatureMatrix>| {
            matrix.and_then(|m| self.checked_feature(path, options.plot, &mut plots, title, m))
        };
        let mfcc = keep("MFCC", raw_mfcc);
        let chroma = keep("Chroma", raw_chroma);
        let spectrogram = keep("Spectrogram", raw_spectrogram);

        Ok(FeatureReport {
            file_name: audio.file_name,
            sample_rate: sr,
            channels: audio.channels,
            duration_secs: duration,
            mfcc,
            chroma,
            spectrogram,
            saved_to_db,
            plots,
        })
    }

    /// Like `check_audio_file`, logging the failure and returning None
    pub fn try_check_audio_file(&self, path: &Path, options: &FeatureOptions) -> Option<FeatureReport> {
        match self.check_audio_file(path, options) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Could not analyze {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save_to_library(&self, path: &Path, sample_rate: u32, duration: f64) -> bool {
        let Some(library) = self.library else {
            tracing::warn!("No database open; not saving {}", path.display());
            return false;
        };

        match library.save_file(path, sample_rate, duration) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Could not save {} to database: {}", path.display(), e);
                false
            }
        }
    }

    /// Check a computed feature and plot it when asked
    ///
    /// An empty matrix counts as a failure and yields None.
    fn checked_feature(
        &self,
        path: &Path,
        plot: bool,
        plots: &mut Vec<PathBuf>,
        title: &str,
        matrix: FeatureMatrix,
    ) -> Option<FeatureMatrix> {
        if matrix.is_empty() {
            tracing::warn!("No {} features for {}", title, path.display());
            return None;
        }
        tracing::debug!(feature = title, rows = matrix.rows(), cols = matrix.cols(), "computed");

        if plot {
            let suffix = title.to_lowercase();
            let saved = plot_path(&self.output_dir, path, &suffix)
                .and_then(|out| save_heatmap(&matrix, title, &out).map(|()| out));
            self.keep_plot(plots, path, title, saved);
        }

        Some(matrix)
    }

    fn keep_plot(
        &self,
        plots: &mut Vec<PathBuf>,
        path: &Path,
        what: &str,
        saved: Result<PathBuf, PlotError>,
    ) {
        match saved {
            Ok(out) => plots.push(out),
            Err(e) => tracing::warn!("Could not plot {} for {}: {}", what, path.display(), e),
        }
    }
}
