//! Log-magnitude spectrogram

use crate::matrix::FeatureMatrix;
use crate::stft::Stft;

/// Dynamic range kept below the loudest bin, in dB
pub const TOP_DB: f32 = 80.0;

/// Smallest amplitude considered before taking the logarithm
const AMIN: f32 = 1e-5;

/// Convert amplitudes to dB relative to `reference`, clipped to `TOP_DB` below the peak
pub fn amplitude_to_db(amplitudes: &mut [f32], reference: f32) {
    let reference = reference.abs().max(AMIN);
    let mut peak = f32::MIN;

    for a in amplitudes.iter_mut() {
        *a = 20.0 * a.abs().max(AMIN).log10() - 20.0 * reference.log10();
        peak = peak.max(*a);
    }

    let floor = peak - TOP_DB;
    for a in amplitudes.iter_mut() {
        *a = a.max(floor);
    }
}

/// STFT magnitude in dB relative to the loudest bin
///
/// Returns a `(fft_size / 2 + 1) x frames` matrix with values in
/// `[-TOP_DB, 0]`. Empty input gives an empty matrix.
pub fn stft_db(mono: &[f32]) -> FeatureMatrix {
    let stft = Stft::default();
    let frames = stft.magnitudes(mono);
    let mut matrix = FeatureMatrix::from_frames(&frames, stft.num_bins());

    if matrix.is_empty() {
        return matrix;
    }

    let reference = matrix.data().iter().copied().fold(0.0f32, f32::max);
    amplitude_to_db(matrix.data_mut(), reference);
    matrix
}
