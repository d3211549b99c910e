//! Audio analysis for hsoundworks
//!
//! Tempo estimation and spectral feature extraction (MFCC, chroma,
//! spectrogram) over in-memory mono buffers. Nothing here touches the
//! filesystem; decoding and persistence live in `hsw-library`.

mod chroma;
mod matrix;
mod mfcc;
mod spectrogram;
mod stft;
mod tempo;

pub use chroma::{chroma_stft, ChromaAnalyzer, PITCH_CLASSES};
pub use matrix::FeatureMatrix;
pub use mfcc::{mfcc, MfccAnalyzer, DEFAULT_MEL_BANDS, DEFAULT_MFCC_COEFFICIENTS};
pub use spectrogram::{amplitude_to_db, stft_db, TOP_DB};
pub use stft::{Stft, DEFAULT_FFT_SIZE, DEFAULT_HOP_SIZE};
pub use tempo::{TempoEstimate, TempoEstimator};
