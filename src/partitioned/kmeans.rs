//! Lloyd-style k-means over a [`VectorStore`], used to build coarse partitions.
//!
//! Assignment uses the index metric's ranking key, so the same notion of
//! "nearest centroid" applies at build time and at query time. Initial
//! centroids are distinct rows drawn with a seeded RNG, which keeps builds
//! reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::store::VectorStore;

/// Outcome of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// One centroid per cluster, each of the store's dimension.
    pub centroids: VectorStore,
    /// Cluster of each vector, indexed by vector id.
    pub assignments: Vec<usize>,
    /// Assign/update rounds performed.
    pub iterations: usize,
    /// Whether assignments stopped changing before the iteration cap.
    pub converged: bool,
}

/// Cluster `store` into `k` groups.
///
/// Fails with `InvalidArgument` unless `1 <= k <= store.len()`.
pub fn kmeans(
    store: &VectorStore,
    metric: DistanceMetric,
    k: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<KMeansResult> {
    let n = store.len();
    if k == 0 || k > n {
        return Err(SearchError::InvalidArgument(format!(
            "cluster count must be between 1 and {n}, got {k}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picks = rand::seq::index::sample(&mut rng, n, k).into_vec();
    picks.sort_unstable();

    let mut centroids = VectorStore::new(store.dimension())?;
    for id in picks {
        if let Some(row) = store.get(id) {
            centroids.push(row)?;
        }
    }

    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations.max(1) {
        iterations += 1;
        let next = assign_all(store, &centroids, metric);
        if next == assignments {
            converged = true;
            break;
        }
        assignments = next;
        centroids = recompute(store, &centroids, &assignments, metric)?;
    }

    if !converged {
        // Keep assignments consistent with the centroids we return.
        assignments = assign_all(store, &centroids, metric);
    }

    tracing::debug!(k, iterations, converged, "k-means finished");

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
        converged,
    })
}

/// Index of the centroid nearest to `vector`; ties go to the lower index.
pub fn nearest_centroid(
    vector: &[f32],
    norm: f32,
    centroids: &VectorStore,
    metric: DistanceMetric,
) -> usize {
    let mut best = 0;
    let mut best_key = f32::INFINITY;
    for (cluster, centroid) in centroids.iter() {
        let key = centroid_key(vector, norm, centroid, centroids.norm(cluster), metric);
        if key < best_key {
            best = cluster;
            best_key = key;
        }
    }
    best
}

/// Ranking key between a vector and a centroid. Centroids the metric cannot
/// score (zero centroids under cosine) rank last instead of failing.
pub(crate) fn centroid_key(
    vector: &[f32],
    norm: f32,
    centroid: &[f32],
    centroid_norm: f32,
    metric: DistanceMetric,
) -> f32 {
    metric
        .distance_with_norms(vector, norm, centroid, centroid_norm)
        .map(|value| metric.rank_key(value))
        .unwrap_or(f32::INFINITY)
}

fn assign_all(store: &VectorStore, centroids: &VectorStore, metric: DistanceMetric) -> Vec<usize> {
    (0..store.len())
        .into_par_iter()
        .map(|id| match store.get(id) {
            Some(row) => nearest_centroid(row, store.norm(id), centroids, metric),
            None => 0,
        })
        .collect()
}

fn recompute(
    store: &VectorStore,
    previous: &VectorStore,
    assignments: &[usize],
    metric: DistanceMetric,
) -> Result<VectorStore> {
    let dim = store.dimension();
    let k = previous.len();
    let mut sums = vec![vec![0.0f32; dim]; k];
    let mut counts = vec![0usize; k];

    for (id, row) in store.iter() {
        let cluster = assignments[id];
        counts[cluster] += 1;
        for (acc, &x) in sums[cluster].iter_mut().zip(row) {
            *acc += x;
        }
    }

    let mut centroids = VectorStore::new(dim)?;
    for (cluster, mut sum) in sums.into_iter().enumerate() {
        if counts[cluster] == 0 {
            // Empty cluster keeps its previous centroid
            if let Some(old) = previous.get(cluster) {
                centroids.push(old)?;
            }
            continue;
        }
        let count = counts[cluster] as f32;
        for x in sum.iter_mut() {
            *x /= count;
        }
        if metric == DistanceMetric::Cosine {
            let norm = crate::vector::l2_norm(&sum);
            if norm > 0.0 {
                sum.iter_mut().for_each(|x| *x /= norm);
            }
        }
        centroids.push(&sum)?;
    }
    Ok(centroids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> VectorStore {
        let mut store = VectorStore::new(2).unwrap();
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            store.push(&[jitter, jitter]).unwrap();
            store.push(&[10.0 + jitter, 10.0 - jitter]).unwrap();
        }
        store
    }

    #[test]
    fn test_separates_blobs() {
        let store = two_blobs();
        let result = kmeans(&store, DistanceMetric::L2, 2, 25, 7).unwrap();

        assert!(result.converged);
        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.assignments.len(), store.len());
        // even ids are near the origin, odd ids near (10, 10)
        let origin = result.assignments[0];
        for (id, &cluster) in result.assignments.iter().enumerate() {
            assert_eq!(cluster == origin, id % 2 == 0);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let store = two_blobs();
        let a = kmeans(&store, DistanceMetric::L2, 3, 25, 42).unwrap();
        let b = kmeans(&store, DistanceMetric::L2, 3, 25, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_cluster_count() {
        let store = two_blobs();
        assert!(matches!(
            kmeans(&store, DistanceMetric::L2, 0, 10, 1),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            kmeans(&store, DistanceMetric::L2, 21, 10, 1),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_iteration_cap_respected() {
        let store = two_blobs();
        let result = kmeans(&store, DistanceMetric::L2, 4, 1, 3).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.assignments.iter().all(|&c| c < 4));
    }

    #[test]
    fn test_nearest_centroid_prefers_lower_index_on_tie() {
        let centroids = VectorStore::from_flat(1, vec![1.0, -1.0]).unwrap();
        assert_eq!(nearest_centroid(&[0.0], 0.0, &centroids, DistanceMetric::L2), 0);
    }
}
