//! Vector type and operations

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A query or stored embedding in d-dimensional space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// A vector of `dimension` zeros
    pub fn zeros(dimension: usize) -> Self {
        Self {
            data: vec![0.0; dimension],
        }
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the components
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Fail with `DimensionMismatch` unless this vector has `expected` components
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        if self.dimension() != expected {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: self.dimension(),
            });
        }
        Ok(())
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        l2_norm(&self.data)
    }

    /// Normalize the vector to unit length
    pub fn normalize(&mut self) -> Result<()> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(SearchError::DegenerateVector(
                "cannot normalize zero vector".to_string(),
            ));
        }
        for x in &mut self.data {
            *x /= norm;
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// Parses a comma-separated list such as `"0.1, 0.0"`.
impl FromStr for Vector {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let data = s
            .split(',')
            .map(|x| {
                x.trim().parse::<f32>().map_err(|_| {
                    SearchError::InvalidArgument(format!("invalid float: {:?}", x.trim()))
                })
            })
            .collect::<Result<Vec<f32>>>()?;
        Ok(Vector::new(data))
    }
}

/// L2 norm of a raw slice
pub fn l2_norm(data: &[f32]) -> f32 {
    data.iter().map(|x| x * x).sum::<f32>().sqrt()
}
