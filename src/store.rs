//! Dense, append-only vector storage

use crate::error::{Result, SearchError};
use crate::vector::l2_norm;

/// Row-major storage of `n` vectors of dimension `d`.
///
/// Ids are the row positions, so they are dense over `[0, n)` and follow
/// insertion order. The store is only appended to while an index is being
/// built; once an index owns it, nothing hands out mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    dimension: usize,
    data: Vec<f32>,
    /// L2 norm per row, used by cosine search.
    norms: Vec<f32>,
}

impl VectorStore {
    /// Create an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SearchError::InvalidArgument(
                "vector dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
            norms: Vec::new(),
        })
    }

    /// Rebuild a store from a row-major buffer.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(SearchError::InvalidArgument(
                "vector dimension must be at least 1".to_string(),
            ));
        }
        if data.len() % dimension != 0 {
            return Err(SearchError::DimensionMismatch {
                expected: dimension,
                actual: data.len() % dimension,
            });
        }
        let norms = data.chunks_exact(dimension).map(l2_norm).collect();
        Ok(Self {
            dimension,
            data,
            norms,
        })
    }

    /// Append a vector, returning its id.
    pub fn push(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let id = self.len();
        self.data.extend_from_slice(vector);
        self.norms.push(l2_norm(vector));
        Ok(id)
    }

    /// Get a vector by id.
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        if id >= self.len() {
            return None;
        }
        let start = id * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    pub(crate) fn norm(&self, id: usize) -> f32 {
        self.norms[id]
    }

    /// Iterate over all `(id, vector)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> {
        self.data.chunks_exact(self.dimension).enumerate()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// The raw row-major buffer.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_push_assigns_dense_ids() {
        let mut store = VectorStore::new(2).unwrap();
        assert_eq!(store.push(&[0.0, 0.0]).unwrap(), 0);
        assert_eq!(store.push(&[1.0, 0.0]).unwrap(), 1);
        assert_eq!(store.push(&[5.0, 5.0]).unwrap(), 2);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1), Some(&[1.0, 0.0][..]));
        assert_eq!(store.get(3), None);
    }

    #[test]
    fn test_dimension_enforced() {
        let mut store = VectorStore::new(3).unwrap();
        store.push(&[1.0, 2.0, 3.0]).unwrap();

        let result = store.push(&[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(VectorStore::new(0), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_norms_cached() {
        let mut store = VectorStore::new(2).unwrap();
        store.push(&[3.0, 4.0]).unwrap();
        assert_relative_eq!(store.norm(0), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_from_flat() {
        let store = VectorStore::from_flat(2, vec![0.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![0, 1]);

        assert!(matches!(
            VectorStore::from_flat(2, vec![0.0, 0.0, 1.0]),
            Err(SearchError::DimensionMismatch { .. })
        ));
    }
}
