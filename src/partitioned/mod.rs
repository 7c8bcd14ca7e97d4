//! Coarse-partitioned (IVF-style) approximate index.
//!
//! Vectors are grouped around k-means centroids at build time. A query ranks
//! the centroids, scans only the members of the `nprobe` nearest clusters,
//! and returns the best `k` of those. Probing every cluster scans every
//! vector and gives exactly the flat result.

pub mod kmeans;

pub use kmeans::{kmeans, KMeansResult};

use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::flat_index::{check_store, PreparedQuery};
use crate::index::Index;
use crate::neighbor_queue::{Neighbor, TopK};
use crate::store::VectorStore;
use crate::vector::Vector;

/// Build-time parameters for a [`PartitionedIndex`].
#[derive(Debug, Clone)]
pub struct PartitionParams {
    /// Number of clusters; `None` picks `sqrt(n)`.
    pub clusters: Option<usize>,
    /// Clusters probed per query; `None` picks [`default_nprobe`].
    pub nprobe: Option<usize>,
    /// Cap on k-means assign/update rounds.
    pub max_iterations: usize,
    /// Seed for centroid initialization.
    pub seed: u64,
}

impl Default for PartitionParams {
    fn default() -> Self {
        Self {
            clusters: None,
            nprobe: None,
            max_iterations: 25,
            seed: 42,
        }
    }
}

impl PartitionParams {
    pub fn new(clusters: usize, nprobe: usize) -> Self {
        Self {
            clusters: Some(clusters),
            nprobe: Some(nprobe),
            ..Default::default()
        }
    }
}

/// Default probe count: one sixteenth of the clusters, at least one.
pub fn default_nprobe(clusters: usize) -> usize {
    (clusters / 16).max(1)
}

/// An approximate index that only scans the clusters nearest the query.
#[derive(Debug, Clone)]
pub struct PartitionedIndex {
    store: VectorStore,
    metric: DistanceMetric,
    centroids: VectorStore,
    assignments: Vec<usize>,
    /// Member ids per cluster, ascending.
    lists: Vec<Vec<usize>>,
    nprobe: usize,
}

impl PartitionedIndex {
    /// Cluster `store` and build the inverted lists.
    pub fn build(store: VectorStore, metric: DistanceMetric, params: &PartitionParams) -> Result<Self> {
        check_store(&store, metric)?;
        let n = store.len();
        if n == 0 {
            let centroids = VectorStore::new(store.dimension())?;
            return Self::from_parts(store, metric, centroids, Vec::new(), params.nprobe);
        }

        let wanted = params
            .clusters
            .unwrap_or_else(|| (n as f64).sqrt().round() as usize);
        let clusters = wanted.clamp(1, n);
        if clusters != wanted {
            tracing::warn!(wanted, clusters, n, "cluster count clamped to vector count");
        }

        let result = kmeans(&store, metric, clusters, params.max_iterations, params.seed)?;
        tracing::info!(
            n,
            clusters,
            iterations = result.iterations,
            converged = result.converged,
            "built partitioned index"
        );
        Self::from_parts(store, metric, result.centroids, result.assignments, params.nprobe)
    }

    /// Reassemble an index from persisted parts, validating their consistency.
    pub fn from_parts(
        store: VectorStore,
        metric: DistanceMetric,
        centroids: VectorStore,
        assignments: Vec<usize>,
        nprobe: Option<usize>,
    ) -> Result<Self> {
        check_store(&store, metric)?;
        if centroids.dimension() != store.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: store.dimension(),
                actual: centroids.dimension(),
            });
        }
        if assignments.len() != store.len() {
            return Err(SearchError::CorruptArtifact(format!(
                "{} cluster assignments for {} vectors",
                assignments.len(),
                store.len()
            )));
        }
        if !store.is_empty() && centroids.is_empty() {
            return Err(SearchError::CorruptArtifact(
                "non-empty partitioned index has no centroids".to_string(),
            ));
        }

        let mut lists = vec![Vec::new(); centroids.len()];
        for (id, &cluster) in assignments.iter().enumerate() {
            let list = lists.get_mut(cluster).ok_or_else(|| {
                SearchError::CorruptArtifact(format!(
                    "vector {id} assigned to cluster {cluster} of {}",
                    centroids.len()
                ))
            })?;
            list.push(id);
        }

        let p = centroids.len();
        let nprobe = nprobe.unwrap_or_else(|| default_nprobe(p)).clamp(1, p.max(1));

        Ok(Self {
            store,
            metric,
            centroids,
            assignments,
            lists,
            nprobe,
        })
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn centroids(&self) -> &VectorStore {
        &self.centroids
    }

    /// Cluster of each vector, indexed by vector id.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn num_partitions(&self) -> usize {
        self.centroids.len()
    }

    /// Sizes of the inverted lists, indexed by cluster.
    pub fn partition_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    /// Set the default probe count, clamped to `[1, num_partitions]`.
    pub fn set_nprobe(&mut self, nprobe: usize) {
        self.nprobe = nprobe.clamp(1, self.num_partitions().max(1));
    }

    /// Search probing `nprobe` clusters instead of the configured default.
    pub fn search_with_nprobe(
        &self,
        query: &Vector,
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<(usize, f32)>> {
        if nprobe == 0 {
            return Err(SearchError::InvalidArgument(
                "nprobe must be a positive integer".to_string(),
            ));
        }
        let Some(prepared) = PreparedQuery::new(&self.store, self.metric, query, k)? else {
            return Ok(Vec::new());
        };

        let probes = self.nearest_clusters(&prepared, nprobe);
        let mut candidates: Vec<usize> = probes
            .iter()
            .flat_map(|&cluster| self.lists[cluster].iter().copied())
            .collect();
        candidates.sort_unstable();

        prepared.top_k(candidates, k)
    }

    fn nearest_clusters(&self, query: &PreparedQuery<'_>, nprobe: usize) -> Vec<usize> {
        let mut top = TopK::new(nprobe.min(self.num_partitions()));
        for (cluster, centroid) in self.centroids.iter() {
            let key = kmeans::centroid_key(
                query.query(),
                query.norm(),
                centroid,
                self.centroids.norm(cluster),
                self.metric,
            );
            top.push(Neighbor::new(cluster, key));
        }
        top.into_sorted_vec().into_iter().map(|n| n.id).collect()
    }
}

impl Index for PartitionedIndex {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        self.search_with_nprobe(query, k, self.nprobe)
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
