//! Grayscale PGM images of waveforms and feature matrices
//!
//! Images use the plain (`P2`) graymap format so any image viewer can open
//! them without an imaging dependency. Matrices are drawn with row 0 at the
//! bottom, so low frequencies and low coefficients sit low in the picture.

use hsw_analysis::FeatureMatrix;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width of waveform images, in pixels
const WAVEFORM_WIDTH: usize = 1000;

/// Height of waveform images, in pixels
const WAVEFORM_HEIGHT: usize = 200;

/// Errors that can occur while writing an image
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Nothing to plot for {0}")]
    Empty(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `<output_dir>/<stem>_<suffix>.pgm`, creating `output_dir` if needed
pub fn plot_path(output_dir: &Path, source: &Path, suffix: &str) -> Result<PathBuf, PlotError> {
    std::fs::create_dir_all(output_dir)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());

    Ok(output_dir.join(format!("{}_{}.pgm", stem, suffix)))
}

/// Write a matrix as a heat map, min-max normalized to 0-255
pub fn save_heatmap(matrix: &FeatureMatrix, title: &str, path: &Path) -> Result<(), PlotError> {
    let (min, max) = matrix
        .min_max()
        .ok_or_else(|| PlotError::Empty(title.to_string()))?;
    let range = max - min;

    let (height, width) = matrix.shape();
    let mut pixels = Vec::with_capacity(width * height);
    for row in (0..height).rev() {
        for &value in matrix.row(row) {
            let normalized = if range > 0.0 { (value - min) / range } else { 0.0 };
            pixels.push((normalized.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }

    write_pgm(path, title, width, height, &pixels)?;
    tracing::info!("Saved {} plot to {}", title, path.display());
    Ok(())
}

/// Write a mono signal as a min/max envelope, one column per block of samples
pub fn save_waveform(mono: &[f32], title: &str, path: &Path) -> Result<(), PlotError> {
    if mono.is_empty() {
        return Err(PlotError::Empty(title.to_string()));
    }

    let width = WAVEFORM_WIDTH.min(mono.len());
    let height = WAVEFORM_HEIGHT;
    let block = mono.len().div_ceil(width);
    let peak = mono.iter().fold(0.0f32, |m, &s| m.max(s.abs())).max(1e-6);

    // -1.0 maps to the bottom row, +1.0 to the top
    let to_row = |v: f32| {
        let y = (1.0 - (v / peak).clamp(-1.0, 1.0)) * 0.5 * (height - 1) as f32;
        y.round() as usize
    };

    let mut pixels = vec![0u8; width * height];
    for (x, chunk) in mono.chunks(block).take(width).enumerate() {
        let (lo, hi) = chunk
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        for y in to_row(hi)..=to_row(lo) {
            pixels[y * width + x] = 255;
        }
    }

    write_pgm(path, title, width, height, &pixels)?;
    tracing::info!("Saved {} plot to {}", title, path.display());
    Ok(())
}

fn write_pgm(
    path: &Path,
    title: &str,
    width: usize,
    height: usize,
    pixels: &[u8],
) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "P2")?;
    writeln!(file, "# {}", title)?;
    writeln!(file, "{} {}", width, height)?;
    writeln!(file, "255")?;

    for row in pixels.chunks(width.max(1)) {
        let line: Vec<String> = row.iter().map(|p| p.to_string()).collect();
        writeln!(file, "{}", line.join(" "))?;
    }

    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_pgm(path: &Path) -> (usize, usize, Vec<Vec<u8>>) {
        let content = std::fs::read_to_string(path).unwrap();
        let mut lines = content.lines().filter(|l| !l.starts_with('#'));
        assert_eq!(lines.next(), Some("P2"));

        let dims: Vec<usize> = lines
            .next()
            .unwrap()
            .split_whitespace()
            .map(|d| d.parse().unwrap())
            .collect();
        assert_eq!(lines.next(), Some("255"));

        let rows = lines
            .map(|l| l.split_whitespace().map(|p| p.parse().unwrap()).collect())
            .collect();
        (dims[0], dims[1], rows)
    }

    #[test]
    fn test_plot_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");

        let path = plot_path(&out, Path::new("/music/loop.one.wav"), "mfcc").unwrap();
        assert_eq!(path, out.join("loop.one_mfcc.pgm"));
        assert!(out.is_dir());
    }

    #[test]
    fn test_heatmap_low_rows_at_bottom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heat.pgm");

        let mut matrix = FeatureMatrix::zeros(2, 3);
        for col in 0..3 {
            matrix.set(1, col, 10.0);
        }
        save_heatmap(&matrix, "test", &path).unwrap();

        let (width, height, rows) = read_pgm(&path);
        assert_eq!((width, height), (3, 2));
        assert_eq!(rows[0], vec![255, 255, 255]);
        assert_eq!(rows[1], vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pgm");

        let result = save_heatmap(&FeatureMatrix::zeros(13, 0), "MFCC", &path);
        assert!(matches!(result, Err(PlotError::Empty(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_waveform_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.pgm");

        let mono: Vec<f32> = (0..22050).map(|i| (i as f32 * 0.01).sin()).collect();
        save_waveform(&mono, "Waveform", &path).unwrap();

        let (width, height, rows) = read_pgm(&path);
        assert_eq!((width, height), (WAVEFORM_WIDTH, WAVEFORM_HEIGHT));
        assert_eq!(rows.len(), WAVEFORM_HEIGHT);
        // A full-scale sine reaches both the top and bottom rows
        assert!(rows[0].contains(&255));
        assert!(rows[WAVEFORM_HEIGHT - 1].contains(&255));
    }

    #[test]
    fn test_empty_waveform_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = save_waveform(&[], "Waveform", &dir.path().join("w.pgm"));
        assert!(matches!(result, Err(PlotError::Empty(_))));
    }
}
