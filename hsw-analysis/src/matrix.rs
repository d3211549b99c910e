//! Dense feature matrix (features on rows, time frames on columns)

/// Row-major `rows x cols` matrix of feature values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Create a matrix filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from per-frame feature vectors
    ///
    /// Each frame becomes one column. Frames shorter than `rows` are zero
    /// filled, longer ones are truncated.
    pub fn from_frames(frames: &[Vec<f32>], rows: usize) -> Self {
        let mut matrix = Self::zeros(rows, frames.len());
        for (col, frame) in frames.iter().enumerate() {
            for (row, &value) in frame.iter().take(rows).enumerate() {
                matrix.set(row, col, value);
            }
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    /// All values of one feature across time
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Mean of each row (time-averaged feature vector)
    pub fn row_means(&self) -> Vec<f32> {
        if self.cols == 0 {
            return vec![0.0; self.rows];
        }
        (0..self.rows)
            .map(|r| self.row(r).iter().sum::<f32>() / self.cols as f32)
            .collect()
    }

    /// Smallest and largest finite values, or None for an empty matrix
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frames_layout() {
        let frames = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0]];
        let m = FeatureMatrix::from_frames(&frames, 2);

        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.row(0), &[1.0, 3.0, 5.0]);
        assert_eq!(m.row(1), &[2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_min_max_and_means() {
        let m = FeatureMatrix::from_frames(&[vec![-2.0, 4.0], vec![2.0, 8.0]], 2);
        assert_eq!(m.min_max(), Some((-2.0, 8.0)));
        assert_eq!(m.row_means(), vec![0.0, 6.0]);
        assert_eq!(FeatureMatrix::default().min_max(), None);
    }
}
