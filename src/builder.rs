//! Build step: (vector, payload) pairs in, index + catalog out.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, ItemCatalog};
use crate::distance::DistanceMetric;
use crate::embedding::Embedder;
use crate::error::{Result, SearchError};
use crate::flat_index::FlatIndex;
use crate::index::IndexStructure;
use crate::partitioned::{PartitionParams, PartitionedIndex};
use crate::store::VectorStore;
use crate::vector::Vector;

/// Which index structure to build.
#[derive(Debug, Clone)]
pub enum IndexLayout {
    Flat,
    Partitioned(PartitionParams),
}

/// Accumulates vectors and their catalog entries in lockstep, so both sides
/// always agree on ids.
#[derive(Debug)]
pub struct IndexBuilder {
    metric: DistanceMetric,
    store: VectorStore,
    catalog: ItemCatalog,
}

impl IndexBuilder {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        Ok(Self {
            metric,
            store: VectorStore::new(dimension)?,
            catalog: ItemCatalog::new(),
        })
    }

    /// Append one item, returning its id.
    pub fn add(&mut self, vector: &Vector, entry: CatalogEntry) -> Result<usize> {
        vector.check_dimension(self.store.dimension())?;
        if self.metric == DistanceMetric::Cosine && vector.norm() == 0.0 {
            return Err(SearchError::DegenerateVector(format!(
                "item {:?} has an all-zero vector",
                entry.title
            )));
        }
        let id = self.store.push(vector.as_slice())?;
        let catalog_id = self.catalog.push(entry);
        debug_assert_eq!(id, catalog_id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Freeze the accumulated items into an index.
    pub fn build(self, layout: &IndexLayout) -> Result<(IndexStructure, ItemCatalog)> {
        let n = self.store.len();
        let index: IndexStructure = match layout {
            IndexLayout::Flat => FlatIndex::new(self.store, self.metric)?.into(),
            IndexLayout::Partitioned(params) => {
                PartitionedIndex::build(self.store, self.metric, params)?.into()
            }
        };
        tracing::info!(n, metric = %self.metric, kind = %index.kind(), "index built");
        Ok((index, self.catalog))
    }
}

/// One line of a JSON-lines corpus file.
///
/// Items without a precomputed `vector` are embedded from their text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl CorpusRecord {
    /// Text handed to the embedder for this record.
    pub fn text(&self) -> String {
        if self.summary.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.summary)
        }
    }
}

/// Read a JSON-lines corpus; blank lines are skipped.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<CorpusRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            SearchError::SerializationError(format!(
                "{}:{}: {e}",
                path.display(),
                line_no + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Build an index from corpus records, embedding the ones without vectors.
pub fn build_from_corpus(
    records: Vec<CorpusRecord>,
    embedder: &dyn Embedder,
    metric: DistanceMetric,
    layout: &IndexLayout,
) -> Result<(IndexStructure, ItemCatalog)> {
    let mut builder = IndexBuilder::new(embedder.dimension(), metric)?;
    let mut embedded = 0usize;
    for record in records {
        let vector = match record.vector {
            Some(ref data) => Vector::new(data.clone()),
            None => {
                embedded += 1;
                embedder.encode(&record.text())?
            }
        };
        builder.add(&vector, CatalogEntry::new(record.title, record.summary))?;
    }
    tracing::debug!(items = builder.len(), embedded, "corpus loaded");
    builder.build(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::index::{Index, IndexKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_keeps_ids_aligned() {
        let mut builder = IndexBuilder::new(2, DistanceMetric::L2).unwrap();
        assert_eq!(builder.add(&Vector::new(vec![0.0, 0.0]), CatalogEntry::new("a", "")).unwrap(), 0);
        assert_eq!(builder.add(&Vector::new(vec![1.0, 0.0]), CatalogEntry::new("b", "")).unwrap(), 1);

        let err = builder.add(&Vector::new(vec![1.0]), CatalogEntry::new("c", ""));
        assert!(matches!(err, Err(SearchError::DimensionMismatch { .. })));

        let (index, catalog) = builder.build(&IndexLayout::Flat).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().title, "b");
    }

    #[test]
    fn test_cosine_rejects_zero_vector() {
        let mut builder = IndexBuilder::new(2, DistanceMetric::Cosine).unwrap();
        assert!(matches!(
            builder.add(&Vector::zeros(2), CatalogEntry::new("z", "")),
            Err(SearchError::DegenerateVector(_))
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_read_and_build_corpus() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "Protein folding", "summary": "deep learning for protein structure"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"title": "Galaxies", "summary": "redshift survey of galaxy clusters"}}"#).unwrap();
        writeln!(file, r#"{{"title": "Preset", "vector": [1.0, 0.0, 0.0, 0.0]}}"#).unwrap();

        let records = read_corpus(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].summary, "");

        let embedder = HashingEmbedder::new(4).unwrap();
        let layout = IndexLayout::Partitioned(PartitionParams::new(2, 2));
        let (index, catalog) =
            build_from_corpus(records, &embedder, DistanceMetric::L2, &layout).unwrap();
        assert_eq!(index.kind(), IndexKind::Partitioned);
        assert_eq!(index.len(), 3);
        assert_eq!(catalog.get(2).unwrap().title, "Preset");
        assert_eq!(index.store().get(2), Some(&[1.0, 0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_bad_corpus_line_reports_position() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "ok"}}"#).unwrap();
        writeln!(file, "{{broken").unwrap();

        let err = read_corpus(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
