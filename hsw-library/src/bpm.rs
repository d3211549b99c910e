//! Folder-level BPM analysis

use crate::loader::{AudioLoader, LoadError};
use crate::scanner::{discover_or_empty, ScanConfig};
use hsw_analysis::TempoEstimator;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lowest BPM considered plausible
pub const MIN_BPM: f32 = 0.0;

/// Highest BPM considered plausible
pub const MAX_BPM: f32 = 300.0;

/// Rate every file is resampled to before tempo estimation
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Errors that can occur while computing a BPM
#[derive(Error, Debug)]
pub enum BpmError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("No tempo detected in {0}")]
    NoTempo(PathBuf),
}

/// BPM of one file, as logged to CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmResult {
    pub filename: String,
    pub bpm: u32,
}

impl BpmResult {
    pub fn new(filename: impl Into<String>, bpm: u32) -> Self {
        Self {
            filename: filename.into(),
            bpm,
        }
    }
}

/// Loads files at the analysis rate and estimates their tempo
pub struct BpmAnalyzer {
    loader: AudioLoader,
    estimator: TempoEstimator,
}

impl Default for BpmAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BpmAnalyzer {
    pub fn new() -> Self {
        Self {
            loader: AudioLoader::with_sample_rate(ANALYSIS_SAMPLE_RATE),
            estimator: TempoEstimator::new(ANALYSIS_SAMPLE_RATE),
        }
    }

    /// Estimate the BPM of one file, rounded to the nearest integer
    ///
    /// Values outside 0-300 are logged as unusual but still returned.
    pub fn calculate_bpm(&self, path: &Path) -> Result<u32, BpmError> {
        let audio = self.loader.load(path)?;
        let estimate = self
            .estimator
            .estimate(&audio.to_mono())
            .ok_or_else(|| BpmError::NoTempo(path.to_path_buf()))?;

        if estimate.bpm <= MIN_BPM || estimate.bpm > MAX_BPM {
            tracing::warn!(
                "Unusual BPM value {:.1} detected for {}",
                estimate.bpm,
                audio.file_name
            );
        }

        Ok(estimate.bpm.max(0.0).round() as u32)
    }

    /// Like `calculate_bpm`, logging the failure and returning None
    pub fn try_calculate_bpm(&self, path: &Path) -> Option<u32> {
        match self.calculate_bpm(path) {
            Ok(bpm) => Some(bpm),
            Err(e) => {
                tracing::warn!("Could not calculate BPM for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// BPM of every audio file in a folder
    ///
    /// Files that fail or come out at 0 BPM are left out.
    pub fn analyze_folder(&self, config: &ScanConfig) -> Vec<BpmResult> {
        discover_or_empty(config)
            .iter()
            .filter_map(|path| {
                let bpm = self.try_calculate_bpm(path).filter(|&bpm| bpm > 0)?;
                let filename = path.file_name()?.to_string_lossy().to_string();
                Some(BpmResult::new(filename, bpm))
            })
            .collect()
    }
}

/// Estimate the BPM of one file with a fresh analyzer
pub fn calculate_bpm(path: &Path) -> Result<u32, BpmError> {
    BpmAnalyzer::new().calculate_bpm(path)
}
