//! Text embedding seam.
//!
//! The engine only needs `encode(text) -> vector` with a fixed dimension.
//! Real deployments plug a model in behind [`Embedder`]; [`HashingEmbedder`]
//! is a dependency-free, deterministic stand-in (signed feature hashing of
//! word tokens) used by the CLI and tests.

use crate::error::{Result, SearchError};
use crate::vector::Vector;

/// Turns text into a vector of fixed dimension.
///
/// Implementations must be deterministic for a given model version and safe
/// to call from many threads at once.
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Encode one text.
    fn encode(&self, text: &str) -> Result<Vector>;
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bag-of-words embedder using the signed hashing trick.
///
/// Each lower-cased alphanumeric token adds ±1 to one of `dimension`
/// buckets; the result is scaled to unit length. Text without tokens maps to
/// the zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SearchError::InvalidArgument(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self { dimension })
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vector> {
        let mut vector = Vector::zeros(self.dimension);
        let buckets = vector.as_mut_slice();

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            buckets[bucket] += sign;
        }

        if vector.norm() > 0.0 {
            vector.normalize()?;
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}
