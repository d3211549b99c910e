//! Short-time Fourier transform shared by the feature extractors

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// FFT size used by every extractor unless told otherwise
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Hop between consecutive frames (~23ms at 22.05kHz)
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Hann-windowed STFT with centered frames
///
/// The signal is zero padded by half a window on both sides, so a signal of
/// `n` samples yields `1 + n / hop_size` frames and frame `t` is centered
/// on sample `t * hop_size`.
pub struct Stft {
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl Default for Stft {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE, DEFAULT_HOP_SIZE)
    }
}

impl Stft {
    /// Create a new STFT with the given window and hop sizes
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Pre-compute Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        Self {
            fft_size,
            hop_size: hop_size.max(1),
            fft,
            window,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of non-negative frequency bins per frame
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop_size
        }
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Magnitude spectrum of every frame
    pub fn magnitudes(&self, mono: &[f32]) -> Vec<Vec<f32>> {
        self.process(mono, |c| c.norm())
    }

    /// Power spectrum (squared magnitude) of every frame
    pub fn power(&self, mono: &[f32]) -> Vec<Vec<f32>> {
        self.process(mono, |c| c.norm_sqr())
    }

    fn process(&self, mono: &[f32], map: impl Fn(&Complex<f32>) -> f32) -> Vec<Vec<f32>> {
        if mono.is_empty() {
            return Vec::new();
        }

        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; mono.len() + 2 * pad];
        padded[pad..pad + mono.len()].copy_from_slice(mono);

        let num_frames = self.num_frames(mono.len());
        let num_bins = self.num_bins();
        let mut buffer = vec![Complex::new(0.0, 0.0); self.fft_size];
        let mut frames = Vec::with_capacity(num_frames);

        for t in 0..num_frames {
            let start = t * self.hop_size;
            let frame = &padded[start..start + self.fft_size];

            for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }

            self.fft.process(&mut buffer);
            frames.push(buffer[..num_bins].iter().map(&map).collect());
        }

        frames
    }
}
