//! Brute-force flat index: exhaustive O(n log k) k-NN search

use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::index::Index;
use crate::neighbor_queue::{Neighbor, TopK};
use crate::store::VectorStore;
use crate::vector::Vector;

/// A flat (brute-force) index that computes distance to every stored vector.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    store: VectorStore,
    metric: DistanceMetric,
}

impl FlatIndex {
    /// Wrap a built store. Cosine indexes reject zero vectors up front so
    /// that no query can trip over one later.
    pub fn new(store: VectorStore, metric: DistanceMetric) -> Result<Self> {
        check_store(&store, metric)?;
        Ok(Self { store, metric })
    }

    /// An index with no vectors.
    pub fn empty(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        Ok(Self {
            store: VectorStore::new(dimension)?,
            metric,
        })
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}

impl Index for FlatIndex {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        let Some(query) = PreparedQuery::new(&self.store, self.metric, query, k)? else {
            return Ok(Vec::new());
        };
        query.top_k(0..self.store.len(), k)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn dimension(&self) -> usize {
        self.store.dimension()
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

/// Reject stores the metric cannot search.
pub(crate) fn check_store(store: &VectorStore, metric: DistanceMetric) -> Result<()> {
    if metric == DistanceMetric::Cosine {
        if let Some(id) = (0..store.len()).find(|&id| store.norm(id) == 0.0) {
            return Err(SearchError::DegenerateVector(format!(
                "vector {id} is all zeros and cannot be indexed for cosine search"
            )));
        }
    }
    Ok(())
}

/// A validated query bound to a store, shared by every index variant so that
/// they score candidates identically.
pub(crate) struct PreparedQuery<'a> {
    store: &'a VectorStore,
    metric: DistanceMetric,
    query: &'a [f32],
    norm: f32,
}

impl<'a> PreparedQuery<'a> {
    /// Validate `k` and the query. Returns `None` when the store is empty,
    /// in which case every search answers with no results.
    pub(crate) fn new(
        store: &'a VectorStore,
        metric: DistanceMetric,
        query: &'a Vector,
        k: usize,
    ) -> Result<Option<Self>> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be a positive integer".to_string(),
            ));
        }
        if store.is_empty() {
            return Ok(None);
        }
        query.check_dimension(store.dimension())?;

        let norm = query.norm();
        if metric == DistanceMetric::Cosine && norm == 0.0 {
            return Err(SearchError::DegenerateVector(
                "query vector is all zeros".to_string(),
            ));
        }

        Ok(Some(Self {
            store,
            metric,
            query: query.as_slice(),
            norm,
        }))
    }

    pub(crate) fn query(&self) -> &[f32] {
        self.query
    }

    pub(crate) fn norm(&self) -> f32 {
        self.norm
    }

    /// Ranking key of the query against a stored vector.
    fn key(&self, id: usize) -> Result<f32> {
        let vector = self.store.get(id).ok_or_else(|| {
            SearchError::InvalidArgument(format!("vector id {id} out of range"))
        })?;
        let value =
            self.metric
                .distance_with_norms(self.query, self.norm, vector, self.store.norm(id))?;
        Ok(self.metric.rank_key(value))
    }

    /// Exhaustive top-k over the given candidate ids.
    pub(crate) fn top_k(
        &self,
        candidates: impl IntoIterator<Item = usize>,
        k: usize,
    ) -> Result<Vec<(usize, f32)>> {
        let mut top = TopK::new(k);
        for id in candidates {
            top.push(Neighbor::new(id, self.key(id)?));
        }

        Ok(top
            .into_sorted_vec()
            .into_iter()
            .map(|n| (n.id, self.metric.from_rank_key(n.key)))
            .collect())
    }
}
