//! # semsearch
//!
//! Semantic k-nearest-neighbor search over a fixed corpus.
//!
//! This library provides:
//! - Dense vector storage with precomputed norms
//! - Distance metrics (squared L2, cosine, inner product)
//! - Exact (flat) and k-means partitioned indexes
//! - Versioned, checksummed index and catalog artifacts
//! - A load-once search engine with an HTTP API
//!
//! ## Example
//!
//! ```rust
//! use semsearch::{CatalogEntry, DistanceMetric, Index, IndexBuilder, IndexLayout, Vector};
//!
//! let mut builder = IndexBuilder::new(2, DistanceMetric::L2).unwrap();
//! builder.add(&Vector::new(vec![0.0, 0.0]), CatalogEntry::new("origin", "")).unwrap();
//! builder.add(&Vector::new(vec![1.0, 0.0]), CatalogEntry::new("unit x", "")).unwrap();
//! builder.add(&Vector::new(vec![5.0, 5.0]), CatalogEntry::new("far away", "")).unwrap();
//!
//! let (index, catalog) = builder.build(&IndexLayout::Flat).unwrap();
//! let hits = index.search(&Vector::new(vec![0.1, 0.0]), 2).unwrap();
//! assert_eq!(hits[0].0, 0);
//! assert_eq!(catalog.get(hits[1].0).unwrap().title, "unit x");
//! ```

pub mod builder;
pub mod catalog;
pub mod config;
pub mod distance;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod flat_index;
pub mod index;
pub mod neighbor_queue;
pub mod partitioned;
pub mod persistence;
pub mod server;
pub mod store;
pub mod vector;

pub use builder::{build_from_corpus, read_corpus, CorpusRecord, IndexBuilder, IndexLayout};
pub use catalog::{CatalogEntry, ItemCatalog};
pub use config::Settings;
pub use distance::DistanceMetric;
pub use embedding::{Embedder, HashingEmbedder};
pub use engine::{EngineCell, EngineHandle, RankedResult, SearchEngine, SearchResponse};
pub use error::{Result, SearchError};
pub use flat_index::FlatIndex;
pub use index::{Index, IndexKind, IndexStructure};
pub use partitioned::{PartitionParams, PartitionedIndex};
pub use persistence::ArtifactPaths;
pub use store::VectorStore;
pub use vector::Vector;
