//! Mel-frequency cepstral coefficients
//!
//! Power STFT → triangular mel filterbank (Slaney mel scale, area
//! normalized) → dB → orthonormal DCT-II, keeping the first `n_mfcc`
//! coefficients per frame.

use crate::matrix::FeatureMatrix;
use crate::stft::Stft;
use std::f32::consts::PI;

/// Number of cepstral coefficients kept per frame
pub const DEFAULT_MFCC_COEFFICIENTS: usize = 13;

/// Number of mel bands in the filterbank
pub const DEFAULT_MEL_BANDS: usize = 128;

/// Dynamic range kept in the log-mel spectrum
const TOP_DB: f32 = 80.0;

/// Floor applied to power values before the logarithm
const AMIN: f32 = 1e-10;

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// MFCC extractor with a pre-computed filterbank and DCT basis
pub struct MfccAnalyzer {
    stft: Stft,
    n_mfcc: usize,
    /// `n_mels` filters, each spanning all STFT bins
    filterbank: Vec<Vec<f32>>,
    /// `n_mfcc` DCT-II basis vectors of length `n_mels`
    dct: Vec<Vec<f32>>,
}

impl MfccAnalyzer {
    /// Create an analyzer with the default 2048/512 STFT and 128 mel bands
    pub fn new(sample_rate: u32, n_mfcc: usize) -> Self {
        Self::with_mel_bands(sample_rate, n_mfcc, DEFAULT_MEL_BANDS)
    }

    pub fn with_mel_bands(sample_rate: u32, n_mfcc: usize, n_mels: usize) -> Self {
        let stft = Stft::default();
        let filterbank = Self::mel_filterbank(&stft, sample_rate, n_mels);
        let dct = Self::dct_basis(n_mfcc.min(n_mels), n_mels);

        Self {
            stft,
            n_mfcc: n_mfcc.min(n_mels),
            filterbank,
            dct,
        }
    }

    /// Build triangular mel filters between 0 Hz and Nyquist
    fn mel_filterbank(stft: &Stft, sample_rate: u32, n_mels: usize) -> Vec<Vec<f32>> {
        let num_bins = stft.num_bins();
        let fft_freqs: Vec<f32> = (0..num_bins)
            .map(|b| stft.bin_frequency(b, sample_rate))
            .collect();

        let max_mel = hz_to_mel(sample_rate as f32 / 2.0);
        let mel_points: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
            .collect();

        (0..n_mels)
            .map(|m| {
                let (lower, center, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                // Area normalization keeps energy per band comparable
                let enorm = 2.0 / (upper - lower).max(f32::EPSILON);

                fft_freqs
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower) / (center - lower).max(f32::EPSILON);
                        let falling = (upper - f) / (upper - center).max(f32::EPSILON);
                        rising.min(falling).max(0.0) * enorm
                    })
                    .collect()
            })
            .collect()
    }

    /// Orthonormal DCT-II basis
    fn dct_basis(n_mfcc: usize, n_mels: usize) -> Vec<Vec<f32>> {
        let n = n_mels as f32;
        (0..n_mfcc)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_mels)
                    .map(|i| scale * (PI * k as f32 * (2 * i + 1) as f32 / (2.0 * n)).cos())
                    .collect()
            })
            .collect()
    }

    pub fn n_mfcc(&self) -> usize {
        self.n_mfcc
    }

    /// Compute the `n_mfcc x frames` coefficient matrix
    pub fn analyze(&self, mono: &[f32]) -> FeatureMatrix {
        let power = self.stft.power(mono);
        if power.is_empty() {
            return FeatureMatrix::default();
        }

        // Log-mel spectrum per frame
        let mut log_mel: Vec<Vec<f32>> = power
            .iter()
            .map(|frame| {
                self.filterbank
                    .iter()
                    .map(|filter| {
                        let energy: f32 = filter.iter().zip(frame).map(|(w, p)| w * p).sum();
                        10.0 * energy.max(AMIN).log10()
                    })
                    .collect()
            })
            .collect();

        let peak = log_mel
            .iter()
            .flatten()
            .copied()
            .fold(f32::MIN, f32::max);
        for v in log_mel.iter_mut().flatten() {
            *v = v.max(peak - TOP_DB);
        }

        let frames: Vec<Vec<f32>> = log_mel
            .iter()
            .map(|mel| {
                self.dct
                    .iter()
                    .map(|basis| basis.iter().zip(mel).map(|(b, m)| b * m).sum())
                    .collect()
            })
            .collect();

        FeatureMatrix::from_frames(&frames, self.n_mfcc)
    }
}

/// Compute MFCCs of a mono signal with default filterbank settings
pub fn mfcc(mono: &[f32], sample_rate: u32, n_mfcc: usize) -> FeatureMatrix {
    MfccAnalyzer::new(sample_rate, n_mfcc).analyze(mono)
}
