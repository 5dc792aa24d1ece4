//! Row-major embedding matrix

use candle_core::{DType, Device, Tensor};

use crate::errors::{RagError, Result};

/// Dense `rows × dim` matrix of f32 embeddings, one row per text
///
/// Every row has the same dimension. An empty matrix has zero rows and a
/// dimension of zero until the first rows are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from individual rows, which must all share one length
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(dim * rows.len());

        for row in rows {
            if row.len() != dim {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }

        Ok(Self { dim, data })
    }

    /// Build from a `[rows, dim]` tensor
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        let (rows, dim) = tensor.dims2()?;
        let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        debug_assert_eq!(data.len(), rows * dim);

        Ok(Self { dim, data })
    }

    /// Copy into a `[rows, dim]` tensor
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        Ok(Tensor::from_slice(&self.data, (self.rows(), self.dim), device)?)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Length of every row
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Row `index`, if present
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows() {
            return None;
        }
        let start = index * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    /// Iterate rows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact(0) panics, and an empty matrix has no rows anyway
        self.data.chunks_exact(self.dim.max(1))
    }

    /// Append all rows of `other` after the rows of `self`
    pub fn append(&mut self, other: EmbeddingMatrix) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.dim != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: other.dim,
            });
        }
        self.data.extend(other.data);
        Ok(())
    }
}

/// Dot product of two equally long vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
