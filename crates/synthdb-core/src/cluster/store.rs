//! On-disk shapes consumed and produced by the partitioner.
//!
//! - embeddings: `{ "ids": [...], "vectors": [[f32, ...], ...] }`
//! - centroids:  `{ "centroids": [[f32, ...], ...] }`
//! - cluster map: `{ "0": ["id", ...], "1": [...] }`

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ClusterError, ClusterResult};

/// Cluster index → ordered member ids.
pub type ClusterMap = BTreeMap<usize, Vec<String>>;

/// Ids paired with their embedding vectors, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSet {
    pub ids: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingSet {
    /// Build a set, checking that ids are unique, lengths agree and every
    /// vector has the same dimension.
    pub fn new(ids: Vec<String>, vectors: Vec<Vec<f32>>) -> ClusterResult<Self> {
        let set = Self { ids, vectors };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> ClusterResult<()> {
        if self.ids.len() != self.vectors.len() {
            return Err(ClusterError::LengthMismatch {
                ids: self.ids.len(),
                vectors: self.vectors.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.ids.len());
        for id in &self.ids {
            if !seen.insert(id.as_str()) {
                return Err(ClusterError::DuplicateId(id.clone()));
            }
        }

        if let Some(first) = self.vectors.first() {
            let expected = first.len();
            if let Some(bad) = self.vectors.iter().find(|v| v.len() != expected) {
                return Err(ClusterError::DimensionMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension, or `None` for an empty set.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(|v| v.len())
    }

    /// Load and validate an embeddings file.
    pub fn load(path: &Path) -> ClusterResult<Self> {
        let bytes = std::fs::read(path)?;
        let set: EmbeddingSet = serde_json::from_slice(&bytes)?;
        set.validate()?;
        Ok(set)
    }
}

/// Representative vectors persisted between incremental runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CentroidSet {
    pub centroids: Vec<Vec<f32>>,
}

impl CentroidSet {
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn load(path: &Path) -> ClusterResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the centroid file, creating parent directories.
    pub fn save(&self, path: &Path) -> ClusterResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }
}
