// Fixed-dimension embedding vectors
// Normalization, inner product and the BLOB codec used by the chunk store

#[cfg(test)]
mod tests;

use crate::{IndexError, Result};

/// Values whose squared norm falls below this are treated as the zero vector
const ZERO_NORM_EPSILON: f32 = 1e-12;

/// Tolerance used when checking that a vector is unit length
const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// A dense `f32` vector with a fixed, caller-checked dimension
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector(Vec<f32>);

impl Vector {
    /// Wrap `values`, rejecting them unless they have exactly `dimension` entries
    #[inline]
    pub fn new(values: Vec<f32>, dimension: usize) -> Result<Self> {
        if values.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    /// The zero vector of the given dimension
    #[inline]
    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    /// Unit basis vector `e_axis`
    #[inline]
    pub fn basis(dimension: usize, axis: usize) -> Self {
        let mut values = vec![0.0; dimension];
        if let Some(value) = values.get_mut(axis) {
            *value = 1.0;
        }
        Self(values)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Euclidean (L2) norm
    #[inline]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().map(|v| v * v).sum::<f32>() < ZERO_NORM_EPSILON
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() <= UNIT_NORM_TOLERANCE
    }

    /// Scale to unit length in place. The zero vector is left untouched.
    #[inline]
    pub fn normalize(&mut self) {
        if self.is_zero() {
            return;
        }
        let norm = self.norm();
        for value in &mut self.0 {
            *value /= norm;
        }
    }

    #[inline]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Inner product. Equals cosine similarity when both sides are unit length.
    #[inline]
    pub fn dot(&self, other: &Self) -> f32 {
        dot(&self.0, &other.0)
    }

    /// Little-endian `f32` encoding used for the store's embedding column
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 4);
        for value in &self.0 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(IndexError::StoreUnavailable(format!(
                "Embedding blob length {} is not a multiple of 4",
                bytes.len()
            )));
        }

        let values = bytes
            .chunks_exact(4)
            .map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();
        Ok(Self(values))
    }
}

impl From<Vec<f32>> for Vector {
    #[inline]
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Inner product over two equal-length slices
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
