//! Search engine: embedder + index + catalog, loaded once and shared.
//!
//! A [`SearchEngine`] is immutable after construction, so any number of
//! threads can query one [`EngineHandle`] without locking. [`EngineCell`] is
//! the one-time initialization barrier in front of it: the first caller runs
//! the loader, concurrent callers wait for that result, and every later
//! caller sees the same engine (or the same load failure).

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{CatalogEntry, ItemCatalog};
use crate::config::Settings;
use crate::distance::DistanceMetric;
use crate::embedding::Embedder;
use crate::error::{Result, SearchError};
use crate::index::{Index, IndexStructure};
use crate::persistence;
use crate::vector::Vector;

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// 1-based position in the response.
    pub rank: usize,
    pub id: usize,
    /// The metric's natural value (inner product for inner-product indexes).
    pub distance: f32,
    pub payload: CatalogEntry,
}

/// Ranked hits plus the time spent producing them.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<RankedResult>,
    pub elapsed: Duration,
}

impl SearchResponse {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Shared ownership of a loaded engine, handed to every request handler.
pub type EngineHandle = Arc<SearchEngine>;

pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    index: IndexStructure,
    catalog: ItemCatalog,
    default_k: usize,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("kind", &self.index.kind())
            .field("metric", &self.index.metric())
            .field("dimension", &self.index.dimension())
            .field("len", &self.index.len())
            .field("default_k", &self.default_k)
            .finish()
    }
}

impl SearchEngine {
    /// Assemble an engine from loaded parts.
    ///
    /// Fails if the catalog and index disagree on size or the embedder
    /// produces vectors of a different dimension than the index holds.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: IndexStructure,
        catalog: ItemCatalog,
    ) -> Result<Self> {
        if index.len() != catalog.len() {
            return Err(SearchError::SizeMismatch {
                index: index.len(),
                catalog: catalog.len(),
            });
        }
        if embedder.dimension() != index.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedder.dimension(),
            });
        }
        Ok(Self {
            embedder,
            index,
            catalog,
            default_k: 5,
        })
    }

    /// Load the artifacts named in `settings` and apply its overrides.
    pub fn open(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let started = Instant::now();
        let (mut index, catalog) = persistence::read_artifacts(&settings.artifacts)?;

        if let Some(expected) = settings.metric {
            if expected != index.metric() {
                return Err(SearchError::MetricMismatch {
                    expected: expected.to_string(),
                    actual: index.metric().to_string(),
                });
            }
        }
        if let (Some(nprobe), IndexStructure::Partitioned(p)) = (settings.nprobe, &mut index) {
            p.set_nprobe(nprobe);
        }

        let engine = Self::new(embedder, index, catalog)?.with_default_k(settings.default_k)?;
        tracing::info!(
            kind = %engine.index.kind(),
            metric = %engine.index.metric(),
            dimension = engine.index.dimension(),
            vectors = engine.index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search assets loaded"
        );
        Ok(engine)
    }

    pub fn with_default_k(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "default k must be a positive integer".to_string(),
            ));
        }
        self.default_k = k;
        Ok(self)
    }

    /// Encode `query` and return its `k` best matches.
    pub fn search(&self, query: &str, k: usize) -> Result<SearchResponse> {
        let started = Instant::now();
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query text is empty".to_string()));
        }
        check_k(k)?;

        let vector = self.embedder.encode(query)?;
        let results = self.rank(self.index.search(&vector, k)?)?;
        Ok(SearchResponse {
            results,
            elapsed: started.elapsed(),
        })
    }

    /// [`search`](Self::search) with the configured default `k`.
    pub fn search_default(&self, query: &str) -> Result<SearchResponse> {
        self.search(query, self.default_k)
    }

    /// Rank an already encoded query vector.
    pub fn search_vector(&self, vector: &Vector, k: usize) -> Result<SearchResponse> {
        let started = Instant::now();
        check_k(k)?;
        let results = self.rank(self.index.search(vector, k)?)?;
        Ok(SearchResponse {
            results,
            elapsed: started.elapsed(),
        })
    }

    fn rank(&self, hits: Vec<(usize, f32)>) -> Result<Vec<RankedResult>> {
        hits.into_iter()
            .enumerate()
            .map(|(i, (id, distance))| {
                let payload = self.catalog.get(id).ok_or_else(|| {
                    tracing::error!(id, catalog_len = self.catalog.len(), "index returned an id with no catalog entry");
                    SearchError::MissingCatalogEntry { id }
                })?;
                Ok(RankedResult {
                    rank: i + 1,
                    id,
                    distance,
                    payload: payload.clone(),
                })
            })
            .collect()
    }

    pub fn index(&self) -> &IndexStructure {
        &self.index
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(SearchError::InvalidArgument(
            "k must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// One-time initialization barrier for a shared engine.
///
/// The loader runs at most once per cell. A failed load is remembered: the
/// cell never hands out a partially built engine and never retries, so a
/// process whose assets are broken refuses every query.
#[derive(Default)]
pub struct EngineCell {
    cell: OnceLock<std::result::Result<EngineHandle, String>>,
}

impl EngineCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the engine, running `load` if no thread has yet.
    pub fn get_or_load<F>(&self, load: F) -> Result<EngineHandle>
    where
        F: FnOnce() -> Result<SearchEngine>,
    {
        let outcome = self.cell.get_or_init(|| {
            load().map(Arc::new).map_err(|e| {
                tracing::error!(error = %e, "failed to load search assets");
                e.to_string()
            })
        });
        match outcome {
            Ok(engine) => Ok(Arc::clone(engine)),
            Err(reason) => Err(SearchError::AssetsUnavailable(reason.clone())),
        }
    }

    /// The engine, if a load has already succeeded.
    pub fn get(&self) -> Option<EngineHandle> {
        match self.cell.get() {
            Some(Ok(engine)) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Whether a load has been attempted (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}
