//! Chromagram from the power STFT
//!
//! Every FFT bin is assigned to its nearest pitch class (0 = C). Bins are
//! weighted by how close they sit to an equal-tempered pitch and by a
//! Gaussian over octaves centered on C5, then each frame is scaled so its
//! strongest pitch class is 1.0.

use crate::matrix::FeatureMatrix;
use crate::stft::Stft;

/// Number of pitch classes (rows of the chromagram)
pub const PITCH_CLASSES: usize = 12;

/// Reference frequency for A4 (440 Hz)
const A4_FREQ: f32 = 440.0;

/// Lowest frequency mapped to a pitch class (A0)
const MIN_FREQ: f32 = 27.5;

/// Center of the octave weighting, as a MIDI note (C5)
const OCTAVE_CENTER_MIDI: f32 = 72.0;

/// Standard deviation of the octave weighting, in octaves
const OCTAVE_WIDTH: f32 = 2.0;

/// Chroma extractor with a pre-computed bin-to-pitch-class map
pub struct ChromaAnalyzer {
    stft: Stft,
    bin_to_pitch_class: Vec<Option<u8>>,
    bin_weights: Vec<f32>,
}

impl ChromaAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        let stft = Stft::default();
        let (bin_to_pitch_class, bin_weights) = Self::compute_pitch_class_mapping(&stft, sample_rate);

        Self {
            stft,
            bin_to_pitch_class,
            bin_weights,
        }
    }

    /// Map each FFT bin to a pitch class and a weight
    fn compute_pitch_class_mapping(stft: &Stft, sample_rate: u32) -> (Vec<Option<u8>>, Vec<f32>) {
        let nyquist = sample_rate as f32 / 2.0;
        let mut mapping = Vec::with_capacity(stft.num_bins());
        let mut weights = Vec::with_capacity(stft.num_bins());

        for bin in 0..stft.num_bins() {
            let freq = stft.bin_frequency(bin, sample_rate);

            if freq < MIN_FREQ || freq >= nyquist {
                mapping.push(None);
                weights.push(0.0);
                continue;
            }

            // MIDI note number: 12 * log2(freq / 440) + 69
            let midi_note = 12.0 * (freq / A4_FREQ).log2() + 69.0;
            let pitch_class = ((midi_note.round() as i32 % 12 + 12) % 12) as u8;

            // 1.0 at the exact pitch, 0.0 half a semitone away
            let detune = (midi_note - midi_note.round()).abs();
            let pitch_weight = (1.0 - detune.min(0.5) * 2.0).max(0.0);

            let octaves = (midi_note - OCTAVE_CENTER_MIDI) / 12.0;
            let octave_weight = (-0.5 * (octaves / OCTAVE_WIDTH).powi(2)).exp();

            mapping.push(Some(pitch_class));
            weights.push(pitch_weight * octave_weight);
        }

        (mapping, weights)
    }

    /// Compute the `12 x frames` chromagram
    pub fn analyze(&self, mono: &[f32]) -> FeatureMatrix {
        let frames: Vec<Vec<f32>> = self
            .stft
            .power(mono)
            .iter()
            .map(|spectrum| self.analyze_frame(spectrum))
            .collect();

        FeatureMatrix::from_frames(&frames, PITCH_CLASSES)
    }

    fn analyze_frame(&self, power: &[f32]) -> Vec<f32> {
        let mut chroma = vec![0.0f32; PITCH_CLASSES];

        for (bin, &p) in power.iter().enumerate() {
            if let Some(pitch_class) = self.bin_to_pitch_class[bin] {
                chroma[pitch_class as usize] += p * self.bin_weights[bin];
            }
        }

        let max = chroma.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut chroma {
                *v /= max;
            }
        }

        chroma
    }
}

/// Compute the chromagram of a mono signal
pub fn chroma_stft(mono: &[f32], sample_rate: u32) -> FeatureMatrix {
    ChromaAnalyzer::new(sample_rate).analyze(mono)
}
