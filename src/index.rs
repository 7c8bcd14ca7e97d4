//! Index trait for pluggable search backends

use std::fmt;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::flat_index::FlatIndex;
use crate::partitioned::PartitionedIndex;
use crate::store::VectorStore;
use crate::vector::Vector;

/// A read-only k-nearest-neighbor index.
///
/// Ids are the dense row positions of the underlying [`VectorStore`].
pub trait Index {
    /// Search for the `k` nearest neighbors of `query`.
    ///
    /// Returns `min(k, len)` `(id, distance)` pairs, most relevant first.
    /// Fails with `InvalidArgument` when `k == 0` and with
    /// `DimensionMismatch` when the query has the wrong dimension.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>>;

    /// The distance metric used by this index.
    fn metric(&self) -> DistanceMetric;

    /// The vector dimension.
    fn dimension(&self) -> usize;

    /// The number of vectors in this index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which concrete structure backs an [`IndexStructure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Flat,
    Partitioned,
}

impl IndexKind {
    pub fn tag(&self) -> u8 {
        match self {
            IndexKind::Flat => 0,
            IndexKind::Partitioned => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(IndexKind::Flat),
            1 => Some(IndexKind::Partitioned),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Flat => f.write_str("flat"),
            IndexKind::Partitioned => f.write_str("partitioned"),
        }
    }
}

/// The index variants a persisted artifact can hold.
#[derive(Debug, Clone)]
pub enum IndexStructure {
    Flat(FlatIndex),
    Partitioned(PartitionedIndex),
}

impl IndexStructure {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexStructure::Flat(_) => IndexKind::Flat,
            IndexStructure::Partitioned(_) => IndexKind::Partitioned,
        }
    }

    /// The vectors behind the index.
    pub fn store(&self) -> &VectorStore {
        match self {
            IndexStructure::Flat(index) => index.store(),
            IndexStructure::Partitioned(index) => index.store(),
        }
    }
}

impl From<FlatIndex> for IndexStructure {
    fn from(index: FlatIndex) -> Self {
        IndexStructure::Flat(index)
    }
}

impl From<PartitionedIndex> for IndexStructure {
    fn from(index: PartitionedIndex) -> Self {
        IndexStructure::Partitioned(index)
    }
}

impl Index for IndexStructure {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        match self {
            IndexStructure::Flat(index) => index.search(query, k),
            IndexStructure::Partitioned(index) => index.search(query, k),
        }
    }

    fn metric(&self) -> DistanceMetric {
        match self {
            IndexStructure::Flat(index) => index.metric(),
            IndexStructure::Partitioned(index) => index.metric(),
        }
    }

    fn dimension(&self) -> usize {
        self.store().dimension()
    }

    fn len(&self) -> usize {
        self.store().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        for kind in [IndexKind::Flat, IndexKind::Partitioned] {
            assert_eq!(IndexKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(IndexKind::from_tag(2), None);
        assert_eq!(IndexKind::Partitioned.to_string(), "partitioned");
    }

    #[test]
    fn test_structure_delegates() {
        let mut store = VectorStore::new(2).unwrap();
        store.push(&[0.0, 0.0]).unwrap();
        store.push(&[1.0, 0.0]).unwrap();
        let index: IndexStructure = FlatIndex::new(store, DistanceMetric::L2).unwrap().into();

        assert_eq!(index.kind(), IndexKind::Flat);
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.metric(), DistanceMetric::L2);
        let results = index.search(&Vector::new(vec![0.9, 0.0]), 1).unwrap();
        assert_eq!(results[0].0, 1);
    }
}
