//! Recall tests: the partitioned index against exact flat search.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use semsearch::{
    DistanceMetric, FlatIndex, Index, PartitionParams, PartitionedIndex, Vector, VectorStore,
};

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vector> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>()).collect();
            Vector::new(data)
        })
        .collect()
}

/// `blobs` tight groups of `per_blob` points around random centers.
fn clustered_vectors(rng: &mut StdRng, blobs: usize, per_blob: usize, dim: usize) -> Vec<Vector> {
    let centers: Vec<Vec<f32>> = (0..blobs)
        .map(|_| (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect();
    centers
        .iter()
        .flat_map(|center| {
            (0..per_blob)
                .map(|_| {
                    let data = center.iter().map(|c| c + rng.gen_range(-0.5..0.5)).collect();
                    Vector::new(data)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn to_store(vectors: &[Vector]) -> VectorStore {
    let mut store = VectorStore::new(vectors[0].dimension()).unwrap();
    for v in vectors {
        store.push(v.as_slice()).unwrap();
    }
    store
}

fn recall_at_k(flat_results: &[(usize, f32)], approx_results: &[(usize, f32)]) -> f64 {
    let ground_truth: HashSet<usize> = flat_results.iter().map(|(id, _)| *id).collect();
    let found = approx_results
        .iter()
        .filter(|(id, _)| ground_truth.contains(id))
        .count();
    found as f64 / flat_results.len() as f64
}

fn average_recall(
    flat: &FlatIndex,
    partitioned: &PartitionedIndex,
    queries: &[Vector],
    k: usize,
    nprobe: usize,
) -> f64 {
    let total: f64 = queries
        .iter()
        .map(|q| {
            let exact = flat.search(q, k).unwrap();
            let approx = partitioned.search_with_nprobe(q, k, nprobe).unwrap();
            recall_at_k(&exact, &approx)
        })
        .sum();
    total / queries.len() as f64
}

#[test]
fn test_probing_every_cluster_matches_flat() {
    let mut rng = StdRng::seed_from_u64(7);
    let vectors = random_vectors(&mut rng, 300, 24);
    let queries = random_vectors(&mut rng, 20, 24);

    for metric in [
        DistanceMetric::L2,
        DistanceMetric::Cosine,
        DistanceMetric::InnerProduct,
    ] {
        let flat = FlatIndex::new(to_store(&vectors), metric).unwrap();
        let partitioned =
            PartitionedIndex::build(to_store(&vectors), metric, &PartitionParams::new(12, 1))
                .unwrap();
        let p = partitioned.num_partitions();

        for q in &queries {
            for k in [1, 10, 300, 500] {
                assert_eq!(
                    flat.search(q, k).unwrap(),
                    partitioned.search_with_nprobe(q, k, p).unwrap(),
                    "metric {metric}, k {k}"
                );
            }
        }
    }
}

#[test]
fn test_recall_grows_with_nprobe() {
    let mut rng = StdRng::seed_from_u64(11);
    let vectors = random_vectors(&mut rng, 1000, 32);
    let queries = random_vectors(&mut rng, 30, 32);

    let flat = FlatIndex::new(to_store(&vectors), DistanceMetric::L2).unwrap();
    let partitioned = PartitionedIndex::build(
        to_store(&vectors),
        DistanceMetric::L2,
        &PartitionParams::new(16, 1),
    )
    .unwrap();

    let recalls: Vec<f64> = [1, 2, 4, 8, 16]
        .iter()
        .map(|&nprobe| average_recall(&flat, &partitioned, &queries, 10, nprobe))
        .collect();

    for pair in recalls.windows(2) {
        assert!(pair[0] <= pair[1], "recall dropped: {recalls:?}");
    }
    assert_eq!(recalls[4], 1.0);
}

#[test]
fn test_recall_on_clustered_data() {
    let mut rng = StdRng::seed_from_u64(3);
    let vectors = clustered_vectors(&mut rng, 16, 50, 16);
    let queries: Vec<Vector> = (0..40)
        .map(|i| vectors[(i * 37) % vectors.len()].clone())
        .collect();

    let flat = FlatIndex::new(to_store(&vectors), DistanceMetric::L2).unwrap();
    let partitioned = PartitionedIndex::build(
        to_store(&vectors),
        DistanceMetric::L2,
        &PartitionParams::new(16, 4),
    )
    .unwrap();

    let recall = average_recall(&flat, &partitioned, &queries, 10, partitioned.nprobe());
    assert!(
        recall >= 0.9,
        "Recall {:.3} is below threshold 0.9 with nprobe {}",
        recall,
        partitioned.nprobe()
    );
}
