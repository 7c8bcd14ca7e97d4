//! Versioned binary index artifact and JSON catalog artifact.
//!
//! Index artifact layout (little-endian):
//!
//! ```text
//! [magic "SSIX": 4][version: u32][metric: u8][kind: u8][reserved: 2]
//! [dimension: u32][count: u64][crc32: u32][body: bincode(IndexBody)]
//! ```
//!
//! The crc32 covers the 24 header bytes in front of it and the body, so a
//! flipped metric, kind, dimension, or count is caught like a flipped body
//! byte. The catalog artifact is a JSON `CatalogDocument` that records the
//! checksum of the index it was written with; a catalog paired with any
//! other index is rejected. Both are decoded completely before anything is
//! returned, so a failed load leaves nothing behind.

use crate::catalog::ItemCatalog;
use crate::distance::DistanceMetric;
use crate::error::{Result, SearchError};
use crate::flat_index::FlatIndex;
use crate::index::{Index, IndexKind, IndexStructure};
use crate::partitioned::PartitionedIndex;
use crate::persistence::serialization::{
    self, CatalogDocument, IndexBody, PartitionBody,
};
use crate::store::VectorStore;

/// Magic bytes opening every index artifact.
pub const MAGIC: &[u8; 4] = b"SSIX";

/// Current index artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Current catalog document version.
pub const CATALOG_VERSION: u32 = 1;

/// Size of the fixed index header.
pub const HEADER_SIZE: usize = 28;

/// Header bytes covered by the checksum: everything before the checksum slot.
const CHECKED_HEADER: usize = 24;

/// Decoded fixed header of an index artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub version: u32,
    pub metric: DistanceMetric,
    pub kind: IndexKind,
    pub dimension: usize,
    pub count: usize,
    pub checksum: u32,
}

/// The two byte streams produced by [`save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub index: Vec<u8>,
    pub catalog: Vec<u8>,
}

/// Serialize an index and its catalog together.
///
/// Fails with `SizeMismatch` if they disagree on the item count.
pub fn save(index: &IndexStructure, catalog: &ItemCatalog) -> Result<Artifacts> {
    if index.len() != catalog.len() {
        return Err(SearchError::SizeMismatch {
            index: index.len(),
            catalog: catalog.len(),
        });
    }
    let index_bytes = encode_index(index)?;
    let checksum = inspect(&index_bytes)?.checksum;
    Ok(Artifacts {
        catalog: encode_catalog(catalog, checksum)?,
        index: index_bytes,
    })
}

/// Reconstruct an index and catalog from their artifacts.
///
/// Fails with `SizeMismatch` if the counts differ and with `CorruptArtifact`
/// if the catalog was written alongside a different index.
pub fn load(index_bytes: &[u8], catalog_bytes: &[u8]) -> Result<(IndexStructure, ItemCatalog)> {
    let header = inspect(index_bytes)?;
    let index = decode_index(index_bytes)?;
    let (catalog, index_checksum) = decode_catalog(catalog_bytes)?;
    if index.len() != catalog.len() {
        return Err(SearchError::SizeMismatch {
            index: index.len(),
            catalog: catalog.len(),
        });
    }
    if index_checksum != header.checksum {
        return Err(corrupt(format!(
            "catalog belongs to index {index_checksum:08x}, not {:08x}",
            header.checksum
        )));
    }
    Ok((index, catalog))
}

pub fn encode_index(index: &IndexStructure) -> Result<Vec<u8>> {
    let store = index.store();
    let partitions = match index {
        IndexStructure::Flat(_) => None,
        IndexStructure::Partitioned(p) => Some(PartitionBody {
            centroids: p.centroids().as_flat().to_vec(),
            assignments: p
                .assignments()
                .iter()
                .map(|&c| {
                    u32::try_from(c).map_err(|_| {
                        SearchError::SerializationError(format!("cluster id {c} exceeds u32"))
                    })
                })
                .collect::<Result<Vec<u32>>>()?,
            nprobe: u32::try_from(p.nprobe()).unwrap_or(u32::MAX),
        }),
    };
    let body = serialization::to_bincode(&IndexBody {
        vectors: store.as_flat().to_vec(),
        partitions,
    })?;

    let dimension = u32::try_from(store.dimension()).map_err(|_| {
        SearchError::SerializationError("dimension exceeds u32".to_string())
    })?;

    Ok(assemble(
        index.metric(),
        index.kind(),
        dimension,
        store.len() as u64,
        &body,
    ))
}

/// Lay out the header in front of an encoded body and seal both.
fn assemble(metric: DistanceMetric, kind: IndexKind, dimension: u32, count: u64, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(metric.tag());
    out.push(kind.tag());
    out.extend_from_slice(&[0u8; 2]);
    out.extend_from_slice(&dimension.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    let crc = checksum(&out, body);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn checksum(header: &[u8], body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[..CHECKED_HEADER]);
    hasher.update(body);
    hasher.finalize()
}

/// Decode only the fixed header of an index artifact.
pub fn inspect(bytes: &[u8]) -> Result<ArtifactHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(format!(
            "truncated header: {} of {HEADER_SIZE} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("invalid magic bytes".to_string()));
    }

    let version = read_u32(bytes, 4);
    if version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let metric = DistanceMetric::from_tag(bytes[8])
        .ok_or_else(|| corrupt(format!("unknown metric tag {}", bytes[8])))?;
    let kind = IndexKind::from_tag(bytes[9])
        .ok_or_else(|| corrupt(format!("unknown index kind tag {}", bytes[9])))?;
    let dimension = read_u32(bytes, 12) as usize;
    if dimension == 0 {
        return Err(corrupt("dimension is zero".to_string()));
    }
    let count = usize::try_from(read_u64(bytes, 16))
        .map_err(|_| corrupt("vector count overflows usize".to_string()))?;

    Ok(ArtifactHeader {
        version,
        metric,
        kind,
        dimension,
        count,
        checksum: read_u32(bytes, 24),
    })
}

pub fn decode_index(bytes: &[u8]) -> Result<IndexStructure> {
    let header = inspect(bytes)?;
    let body_bytes = &bytes[HEADER_SIZE..];
    if checksum(bytes, body_bytes) != header.checksum {
        return Err(corrupt("checksum mismatch".to_string()));
    }
    let body: IndexBody = serialization::from_bincode(body_bytes)
        .map_err(|e| corrupt(format!("undecodable body: {e}")))?;

    let d = header.dimension;
    let n = header.count;
    if body.vectors.len() != n.saturating_mul(d) {
        return Err(corrupt(format!(
            "vector payload holds {} floats, header promises {n} x {d}",
            body.vectors.len()
        )));
    }
    let store = VectorStore::from_flat(d, body.vectors)?;

    let index = match (header.kind, body.partitions) {
        (IndexKind::Flat, None) => IndexStructure::Flat(FlatIndex::new(store, header.metric)?),
        (IndexKind::Partitioned, Some(parts)) => {
            if parts.centroids.len() % d != 0 {
                // `actual` is the width of the ragged trailing centroid
                return Err(SearchError::DimensionMismatch {
                    expected: d,
                    actual: parts.centroids.len() % d,
                });
            }
            let centroids = VectorStore::from_flat(d, parts.centroids)?;
            let assignments = parts.assignments.into_iter().map(|c| c as usize).collect();
            IndexStructure::Partitioned(PartitionedIndex::from_parts(
                store,
                header.metric,
                centroids,
                assignments,
                Some(parts.nprobe as usize),
            )?)
        }
        (kind, _) => {
            return Err(corrupt(format!(
                "body does not match the {kind} index kind in the header"
            )))
        }
    };

    tracing::debug!(
        kind = %header.kind,
        metric = %header.metric,
        dimension = d,
        count = n,
        "decoded index artifact"
    );
    Ok(index)
}

/// Encode a catalog bound to the index artifact with checksum `index_checksum`.
pub fn encode_catalog(catalog: &ItemCatalog, index_checksum: u32) -> Result<Vec<u8>> {
    serialization::to_json(&CatalogDocument {
        version: CATALOG_VERSION,
        count: catalog.len(),
        index_checksum,
        entries: catalog.entries().to_vec(),
    })
}

/// Decode a catalog and the index checksum it was written with.
pub fn decode_catalog(bytes: &[u8]) -> Result<(ItemCatalog, u32)> {
    let doc: CatalogDocument = serialization::from_json(bytes)
        .map_err(|e| corrupt(format!("undecodable catalog: {e}")))?;
    if doc.version != CATALOG_VERSION {
        return Err(corrupt(format!(
            "unsupported catalog version {} (expected {CATALOG_VERSION})",
            doc.version
        )));
    }
    if doc.count != doc.entries.len() {
        return Err(corrupt(format!(
            "catalog declares {} entries but holds {}",
            doc.count,
            doc.entries.len()
        )));
    }
    Ok((ItemCatalog::from(doc.entries), doc.index_checksum))
}

fn corrupt(reason: String) -> SearchError {
    SearchError::CorruptArtifact(reason)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}
