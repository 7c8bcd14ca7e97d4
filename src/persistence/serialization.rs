//! Serialization utilities: bincode for vector payloads, JSON for the catalog.

use crate::catalog::CatalogEntry;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// Body of an index artifact, following the fixed binary header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBody {
    /// Row-major vector data, `n * d` floats.
    pub vectors: Vec<f32>,
    /// Present for partitioned indexes only.
    pub partitions: Option<PartitionBody>,
}

/// Coarse-partition state persisted with a partitioned index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionBody {
    /// Row-major centroids, `p * d` floats.
    pub centroids: Vec<f32>,
    /// Cluster of each vector, indexed by vector id.
    pub assignments: Vec<u32>,
    /// Probe count the index was built with.
    pub nprobe: u32,
}

/// On-disk shape of the catalog artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub version: u32,
    pub count: usize,
    /// Checksum of the index artifact this catalog was written with.
    pub index_checksum: u32,
    pub entries: Vec<CatalogEntry>,
}

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| SearchError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| SearchError::SerializationError(e.to_string()))
}

/// Encode data to pretty JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| SearchError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SearchError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bincode_index_body() {
        let body = IndexBody {
            vectors: vec![0.0, 0.0, 1.0, 0.0],
            partitions: Some(PartitionBody {
                centroids: vec![0.5, 0.0],
                assignments: vec![0, 0],
                nprobe: 1,
            }),
        };
        let bytes = to_bincode(&body).unwrap();
        let decoded: IndexBody = from_bincode(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_json_catalog_document() {
        let doc = CatalogDocument {
            version: 1,
            count: 1,
            index_checksum: 0xdead_beef,
            entries: vec![CatalogEntry::new("Title", "Summary")],
        };
        let bytes = to_json(&doc).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"title\": \"Title\""));
        let decoded: CatalogDocument = from_json(&bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_bincode_garbage() {
        let result: Result<IndexBody> = from_bincode(&[1, 2, 3]);
        assert!(matches!(result, Err(SearchError::SerializationError(_))));
    }
}
