//! Tempo estimation via spectral flux onset detection
//!
//! Builds an onset strength envelope from the half-wave rectified change in
//! magnitude spectrum between frames, then picks the beat period with the
//! strongest normalized autocorrelation.

use crate::stft::Stft;

/// Slowest tempo searched by the autocorrelation
const MIN_SEARCH_BPM: f32 = 60.0;

/// Fastest tempo searched by the autocorrelation
const MAX_SEARCH_BPM: f32 = 200.0;

/// Minimum amount of audio needed for an estimate, in seconds
const MIN_DURATION_SECS: f32 = 2.0;

/// Estimated tempo of a clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Beats per minute
    pub bpm: f32,
    /// Autocorrelation strength at the chosen period (0.0 - 1.0)
    pub confidence: f32,
}

/// Tempo estimator over mono audio at a fixed sample rate
pub struct TempoEstimator {
    sample_rate: u32,
    stft: Stft,
}

impl TempoEstimator {
    /// Create a new estimator (2048-point FFT, 512-sample hop)
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stft: Stft::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Onset envelope frames per second
    fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.stft.hop_size() as f32
    }

    /// Estimate the tempo of a mono clip
    ///
    /// Returns None for clips shorter than two seconds, silence, or
    /// material without any periodic onsets.
    pub fn estimate(&self, mono: &[f32]) -> Option<TempoEstimate> {
        if self.sample_rate == 0 || (mono.len() as f32) < self.sample_rate as f32 * MIN_DURATION_SECS {
            return None;
        }

        let onset_fn = self.compute_onset_function(mono);
        if onset_fn.iter().all(|&v| v == 0.0) {
            return None;
        }

        let (bpm, confidence) = self.estimate_bpm_autocorrelation(&onset_fn)?;
        tracing::debug!(bpm, confidence, frames = onset_fn.len(), "tempo estimated");

        Some(TempoEstimate { bpm, confidence })
    }

    /// Compute the spectral flux onset function, normalized to a peak of 1.0
    ///
    /// Only increases in magnitude count; decays don't indicate onsets.
    fn compute_onset_function(&self, mono: &[f32]) -> Vec<f32> {
        let spectra = self.stft.magnitudes(mono);

        let mut onset_fn: Vec<f32> = spectra
            .windows(2)
            .map(|pair| {
                pair[1]
                    .iter()
                    .zip(&pair[0])
                    .map(|(curr, prev)| (curr - prev).max(0.0))
                    .sum()
            })
            .collect();

        let max = onset_fn.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut onset_fn {
                *v /= max;
            }
        }

        onset_fn
    }

    /// Normalized correlation of the onset function with itself at `lag`
    fn correlation_at_lag(onset_fn: &[f32], lag: usize) -> f32 {
        if lag == 0 || lag >= onset_fn.len() {
            return 0.0;
        }

        let mut correlation: f32 = 0.0;
        let mut norm_a: f32 = 0.0;
        let mut norm_b: f32 = 0.0;

        for i in 0..(onset_fn.len() - lag) {
            correlation += onset_fn[i] * onset_fn[i + lag];
            norm_a += onset_fn[i] * onset_fn[i];
            norm_b += onset_fn[i + lag] * onset_fn[i + lag];
        }

        let norm = (norm_a * norm_b).sqrt();
        if norm > 0.0 {
            correlation / norm
        } else {
            0.0
        }
    }

    /// Pick the beat period from the autocorrelation of the onset function
    fn estimate_bpm_autocorrelation(&self, onset_fn: &[f32]) -> Option<(f32, f32)> {
        let frames_per_second = self.frames_per_second();
        let min_lag = ((frames_per_second * 60.0 / MAX_SEARCH_BPM) as usize).max(1);
        let max_lag = (frames_per_second * 60.0 / MIN_SEARCH_BPM).ceil() as usize;

        // At least two periods must fit in the envelope
        let max_lag = max_lag.min(onset_fn.len() / 2);
        if max_lag <= min_lag {
            return None;
        }

        let correlations: Vec<f32> = (min_lag..=max_lag)
            .map(|lag| Self::correlation_at_lag(onset_fn, lag))
            .collect();

        let (best_idx, best_correlation) = correlations
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, c)| if c > best.1 { (i, c) } else { best });

        if best_correlation <= 0.0 {
            return None;
        }

        // Parabolic interpolation around the peak for sub-frame resolution
        let mut lag = (min_lag + best_idx) as f32;
        if best_idx > 0 && best_idx + 1 < correlations.len() {
            let (y0, y1, y2) = (
                correlations[best_idx - 1],
                correlations[best_idx],
                correlations[best_idx + 1],
            );
            let denom = y0 - 2.0 * y1 + y2;
            if denom < 0.0 {
                lag += (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
            }
        }

        let raw_bpm = 60.0 * frames_per_second / lag;
        let final_bpm = self.disambiguate_octave(onset_fn, raw_bpm);

        Some((final_bpm, best_correlation.clamp(0.0, 1.0)))
    }

    /// Disambiguate between octave-related BPM values (e.g., 77 vs 154)
    ///
    /// Very slow candidates are doubled and very fast ones halved. In the
    /// ambiguous 65-95 range the doubled tempo wins when its correlation is
    /// at least 70% of the original's and it lands in 120-180.
    fn disambiguate_octave(&self, onset_fn: &[f32], raw_bpm: f32) -> f32 {
        let frames_per_second = self.frames_per_second();
        let lag_for = |bpm: f32| (frames_per_second * 60.0 / bpm).round() as usize;

        if raw_bpm < 65.0 {
            return raw_bpm * 2.0;
        }

        if raw_bpm > 185.0 {
            return raw_bpm / 2.0;
        }

        if (65.0..=95.0).contains(&raw_bpm) {
            let doubled_bpm = raw_bpm * 2.0;
            let original_corr = Self::correlation_at_lag(onset_fn, lag_for(raw_bpm));
            let doubled_corr = Self::correlation_at_lag(onset_fn, lag_for(doubled_bpm));

            let doubled_is_reasonable = (120.0..=180.0).contains(&doubled_bpm);
            if doubled_is_reasonable && doubled_corr / original_corr.max(0.001) > 0.7 {
                return doubled_bpm;
            }
        }

        // Only halve 170-185 when the half tempo is clearly stronger
        if (170.0..=185.0).contains(&raw_bpm) {
            let halved_bpm = raw_bpm / 2.0;
            let original_corr = Self::correlation_at_lag(onset_fn, lag_for(raw_bpm));
            let halved_corr = Self::correlation_at_lag(onset_fn, lag_for(halved_bpm));

            if halved_corr > original_corr * 1.2 {
                return halved_bpm;
            }
        }

        raw_bpm
    }
}
