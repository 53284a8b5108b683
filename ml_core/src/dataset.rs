use ndarray::Array2;

use crate::{MlErr, Result};

/// A minimal in-memory classification dataset.
///
/// Features are stored row major, one row of `x_size` scalars per sample,
/// paired with an integer class label.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    features: Vec<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Panics
    /// - if `x_size` is zero
    /// - if `features.len() != labels.len() * x_size`
    /// - if `labels` is empty
    pub fn new(x_size: usize, features: Vec<f32>, labels: Vec<usize>) -> Self {
        assert!(x_size > 0, "x_size must be > 0");
        assert!(!labels.is_empty(), "dataset must be non-empty");
        assert_eq!(
            features.len(),
            labels.len() * x_size,
            "features must hold x_size scalars per label"
        );

        Self { x_size, features, labels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn x_size(&self) -> usize {
        self.x_size
    }

    /// Returns the feature row at `idx` (panics if out of bounds).
    #[inline]
    pub fn row(&self, idx: usize) -> &[f32] {
        &self.features[idx * self.x_size..(idx + 1) * self.x_size]
    }

    /// Returns the label at `idx` (panics if out of bounds).
    #[inline]
    pub fn label(&self, idx: usize) -> usize {
        self.labels[idx]
    }

    /// Gathers the given sample indices into an owned batch.
    ///
    /// # Errors
    /// Returns `MlErr` if any index is out of bounds.
    pub fn gather(&self, idxs: &[usize]) -> Result<(Array2<f32>, Vec<usize>)> {
        let mut features = Vec::with_capacity(idxs.len() * self.x_size);
        let mut labels = Vec::with_capacity(idxs.len());

        for &idx in idxs {
            if idx >= self.len() {
                return Err(MlErr::ShapeMismatch {
                    what: "sample index",
                    got: idx,
                    expected: self.len(),
                });
            }
            features.extend_from_slice(self.row(idx));
            labels.push(self.label(idx));
        }

        let batch = Array2::from_shape_vec((idxs.len(), self.x_size), features)
            .map_err(|_| MlErr::InvalidInput("gathered batch is not rectangular"))?;

        Ok((batch, labels))
    }
}

/// Encodes integer labels as one-hot rows sized to the class count.
///
/// # Errors
/// Returns `MlErr` if `classes` is zero or any label falls outside it.
pub fn one_hot(labels: &[usize], classes: usize) -> Result<Array2<f32>> {
    if classes == 0 {
        return Err(MlErr::InvalidInput("class count must be positive"));
    }

    let mut encoded = Array2::zeros((labels.len(), classes));
    for (row, &label) in labels.iter().enumerate() {
        if label >= classes {
            return Err(MlErr::LabelOutOfRange { label, classes });
        }
        encoded[[row, label]] = 1.0;
    }

    Ok(encoded)
}
